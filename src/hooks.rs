//! Hook pipeline
//!
//! Hooks transform the backend model after `format_data` and before it is
//! handed to the renderer. They run strictly in insertion order, each one
//! seeing the output of the previous one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

use crate::error::{ChartisanError, Result};
use crate::models::data::ServerData;
use crate::utils::merge::merge;

/// What a hook receives
pub struct HookContext<'a, D> {
    /// Output of the previous hook (or of `format_data` for the first one)
    pub data: D,
    /// The validated envelope the data was formatted from
    pub server: &'a ServerData,
}

impl<D> HookContext<'_, D> {
    /// Deep merge helper, same semantics as [`crate::utils::merge::merge`]
    pub fn merge(&self, target: &Value, source: &Value) -> Value {
        merge(target, source)
    }
}

type HookFn<D> = Rc<dyn Fn(HookContext<'_, D>) -> Result<D>>;

/// Ordered list of data transforms
pub struct Hooks<D> {
    hooks: Vec<HookFn<D>>,
}

impl<D> Hooks<D> {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Append an infallible hook
    pub fn append<F>(self, hook: F) -> Self
    where
        F: Fn(HookContext<'_, D>) -> D + 'static,
    {
        self.try_append(move |ctx| Ok(hook(ctx)))
    }

    /// Append a hook that may fail. A failure aborts the pipeline and sends
    /// the chart to its error state.
    pub fn try_append<F>(mut self, hook: F) -> Self
    where
        F: Fn(HookContext<'_, D>) -> Result<D> + 'static,
    {
        self.hooks.push(Rc::new(hook));
        self
    }

    /// Append every hook of `other`, keeping their relative order
    pub fn concat(mut self, other: Hooks<D>) -> Self {
        self.hooks.extend(other.hooks);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in order over `data`
    pub fn apply(&self, data: D, server: &ServerData) -> Result<D> {
        self.hooks
            .iter()
            .try_fold(data, |data, hook| hook(HookContext { data, server }))
    }
}

impl<D> Hooks<D>
where
    D: Serialize + DeserializeOwned + 'static,
{
    /// Append a hook that deep merges `partial` into the data
    pub fn with_options(self, partial: Value) -> Self {
        self.try_append(move |ctx| {
            let current = serde_json::to_value(&ctx.data)
                .map_err(|e| ChartisanError::Hook(e.to_string()))?;
            let merged = ctx.merge(&current, &partial);
            serde_json::from_value(merged).map_err(|e| ChartisanError::Hook(e.to_string()))
        })
    }
}

impl<D> Default for Hooks<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for Hooks<D> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

impl<D> fmt::Debug for Hooks<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").field("len", &self.hooks.len()).finish()
    }
}
