//! Shared helpers for the JavaScript bindings
//!
//! Conversion between `JsValue` and the serde models, and mapping of
//! [`ChartisanError`] onto thrown values.

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::ChartisanError;

/// Log an error message with [Chartisan] prefix
#[macro_export]
macro_rules! wasm_error {
    ($($arg:tt)*) => {
        log::error!("[Chartisan] {}", format!($($arg)*))
    };
}

// ============================================================================
// Serialization/Deserialization Helpers
// ============================================================================

/// Deserialize a value from JavaScript
pub fn deserialize<T: DeserializeOwned>(value: JsValue, error_context: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| {
        let msg = format!("{}: {}", error_context, e);
        wasm_error!("{}", msg);
        JsValue::from_str(&msg)
    })
}

/// Serialize a value to JavaScript.
///
/// Maps become plain objects so the result can be handed to chart libraries
/// as-is.
pub fn serialize<T: Serialize + ?Sized>(value: &T, error_context: &str) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| {
            let msg = format!("{}: {}", error_context, e);
            wasm_error!("{}", msg);
            JsValue::from_str(&msg)
        })
}

/// Convert a controller error into a thrown JS `Error`
pub fn to_js_error(err: ChartisanError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Text of a thrown JS value
pub fn describe(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
