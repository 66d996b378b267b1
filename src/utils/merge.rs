//! Deep merge for JSON option objects
//!
//! Used to combine caller supplied partial configuration with defaults and
//! with hook contributed overrides. Neither input is ever mutated; the result
//! is a fresh value.
//!
//! Rules:
//! - two objects merge key by key, recursing where both sides hold a
//!   mergeable value for the same key
//! - two arrays are combined by the configured [`ArrayMerge`] strategy
//!   (concatenation by default)
//! - anything else: the source wins
//!
//! Results are frequently handed back to JavaScript, so keys that would
//! shadow `Object.prototype` members of the target (`__proto__`,
//! `constructor`, ...) are never copied unless the target already owns them.

use serde_json::{Map, Value};

use crate::error::{ChartisanError, Result};

/// Signature of a merge function (also used for per-key overrides)
pub type MergeFn = fn(&Value, &Value, &MergeOptions) -> Value;

/// Signature of a custom array merge
pub type ArrayMergeFn = fn(&[Value], &[Value], &MergeOptions) -> Vec<Value>;

/// Members every plain JavaScript object inherits
const INHERITED_KEYS: &[&str] = &[
    "__proto__",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
    "constructor",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
    "toString",
    "valueOf",
];

/// Marker key carried by framework element objects, which are atomic
const ELEMENT_MARKER: &str = "$$typeof";

/// How two arrays at the same position are combined
#[derive(Clone, Copy)]
pub enum ArrayMerge {
    /// `target ++ source`
    Concat,
    /// The source array replaces the target array
    Overwrite,
    Custom(ArrayMergeFn),
}

impl ArrayMerge {
    fn apply(&self, target: &[Value], source: &[Value], options: &MergeOptions) -> Vec<Value> {
        match self {
            ArrayMerge::Concat => target
                .iter()
                .chain(source.iter())
                .map(|v| clone_value(v, options))
                .collect(),
            ArrayMerge::Overwrite => source.iter().map(|v| clone_value(v, options)).collect(),
            ArrayMerge::Custom(f) => f(target, source, options),
        }
    }
}

/// Merge configuration
#[derive(Clone, Copy)]
pub struct MergeOptions {
    pub array_merge: ArrayMerge,
    /// Decides whether a value is merged recursively or copied wholesale
    pub is_mergeable: fn(&Value) -> bool,
    /// Per-key override of the merge function
    pub custom_merge: Option<fn(&str) -> Option<MergeFn>>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            array_merge: ArrayMerge::Concat,
            is_mergeable: is_mergeable_value,
            custom_merge: None,
        }
    }
}

impl MergeOptions {
    pub fn array_merge(mut self, array_merge: ArrayMerge) -> Self {
        self.array_merge = array_merge;
        self
    }

    pub fn is_mergeable(mut self, f: fn(&Value) -> bool) -> Self {
        self.is_mergeable = f;
        self
    }

    pub fn custom_merge(mut self, f: fn(&str) -> Option<MergeFn>) -> Self {
        self.custom_merge = Some(f);
        self
    }

    fn merge_fn_for(&self, key: &str) -> MergeFn {
        self.custom_merge
            .and_then(|custom| custom(key))
            .unwrap_or(merge_with)
    }
}

/// Default mergeability test: plain objects that are not element markers
pub fn is_mergeable_value(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| !obj.contains_key(ELEMENT_MARKER))
}

/// Deep merge `source` into a copy of `target` with default options
pub fn merge(target: &Value, source: &Value) -> Value {
    merge_with(target, source, &MergeOptions::default())
}

/// Deep merge `source` into a copy of `target`
pub fn merge_with(target: &Value, source: &Value, options: &MergeOptions) -> Value {
    match (target, source) {
        (Value::Array(t), Value::Array(s)) => Value::Array(options.array_merge.apply(t, s, options)),
        (Value::Array(_), _) | (_, Value::Array(_)) => clone_value(source, options),
        _ if (options.is_mergeable)(source) => merge_object(target, source, options),
        _ => source.clone(),
    }
}

/// Fresh copy of `value` with unsafe keys removed at every depth.
/// Non-mergeable values are copied as they are.
fn clone_value(value: &Value, options: &MergeOptions) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| clone_value(v, options)).collect()),
        _ if (options.is_mergeable)(value) => {
            merge_object(&Value::Object(Map::new()), value, options)
        }
        _ => value.clone(),
    }
}

/// Left fold of [`merge`] over an array of values, starting from `{}`
pub fn merge_all(values: &Value) -> Result<Value> {
    merge_all_with(values, &MergeOptions::default())
}

pub fn merge_all_with(values: &Value, options: &MergeOptions) -> Result<Value> {
    let values = values.as_array().ok_or(ChartisanError::MergeArgument)?;
    Ok(values
        .iter()
        .fold(Value::Object(Map::new()), |acc, next| merge_with(&acc, next, options)))
}

fn merge_object(target: &Value, source: &Value, options: &MergeOptions) -> Value {
    let mut destination = Map::new();
    let target_obj = target.as_object().filter(|_| (options.is_mergeable)(target));

    if let Some(target_obj) = target_obj {
        for (key, value) in target_obj {
            destination.insert(key.clone(), clone_value(value, options));
        }
    }

    let Some(source_obj) = source.as_object() else {
        return Value::Object(destination);
    };

    for (key, value) in source_obj {
        let owned = target_obj.and_then(|t| t.get(key));
        if owned.is_none() && INHERITED_KEYS.contains(&key.as_str()) {
            log::warn!("merge: skipping unsafe key '{}'", key);
            continue;
        }

        let merged = match owned {
            Some(existing) if (options.is_mergeable)(value) => {
                (options.merge_fn_for(key))(existing, value, options)
            }
            _ => clone_value(value, options),
        };
        destination.insert(key.clone(), merged);
    }

    Value::Object(destination)
}
