//! Controller configuration
//!
//! Construction options are resolved once, from an immutable set of
//! [`Defaults`] and whatever the caller supplied. Update options only carry
//! the fields that may change between acquisitions.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{ChartisanError, Result};
use crate::models::data::ServerData;
use crate::utils::merge::{merge_with, ArrayMerge, MergeOptions};

/// Available loader animations
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Bar,
    Infinite,
}

/// Available error icons
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    General,
}

/// Determines the options of the loader
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoaderOptions {
    #[serde(rename = "type")]
    pub kind: LoaderKind,
    /// Width and height of the animation, in pixels
    pub size: (u32, u32),
    pub color: String,
    pub text_color: String,
    /// Text under the animation, hidden when empty
    pub text: String,
}

/// Determines the options of the error placeholder
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOptions {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub size: (u32, u32),
    pub color: String,
    pub text_color: String,
    pub text: String,
    /// Render the underlying error message under the text
    pub debug: bool,
}

/// Request options forwarded to the transport
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RequestInit {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl Default for RequestInit {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

impl RequestInit {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Built-in defaults, injected at construction
#[derive(Clone, Debug, PartialEq)]
pub struct Defaults {
    pub el: String,
    pub loader: LoaderOptions,
    pub error: ErrorOptions,
    /// Background of the overlay while it is visible
    pub overlay_color: String,
}

/// The stock defaults
pub static DEFAULTS: Lazy<Defaults> = Lazy::new(|| Defaults {
    el: ".chart".to_string(),
    loader: LoaderOptions {
        kind: LoaderKind::Bar,
        size: (35, 35),
        color: "#000".to_string(),
        text_color: "#a0aec0".to_string(),
        text: "Loading chart".to_string(),
    },
    error: ErrorOptions {
        kind: ErrorKind::General,
        size: (50, 50),
        color: "#f56565".to_string(),
        text_color: "#a0aec0".to_string(),
        text: "There was an error".to_string(),
        debug: true,
    },
    overlay_color: "#FFFFFF".to_string(),
});

/// Producer of the envelope for the lazy data source
pub type DataFn = Rc<dyn Fn() -> Result<Value>>;

/// Where the chart data comes from when no request is made
#[derive(Clone)]
pub enum DataSource {
    /// Already typed envelope
    Envelope(ServerData),
    /// Untyped payload, validated before use
    Json(Value),
    /// Callback invoked at acquisition time
    Lazy(DataFn),
}

impl DataSource {
    /// Wrap a callback returning a typed envelope
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> ServerData + 'static,
    {
        DataSource::Lazy(Rc::new(move || Ok(f().to_value())))
    }

    /// Produce the validated envelope
    pub fn resolve(&self) -> Result<ServerData> {
        match self {
            DataSource::Envelope(data) => Ok(data.clone()),
            DataSource::Json(value) => ServerData::from_value(value.clone()),
            DataSource::Lazy(f) => ServerData::from_value(f()?),
        }
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Envelope(data) => f.debug_tuple("Envelope").field(data).finish(),
            DataSource::Json(value) => f.debug_tuple("Json").field(value).finish(),
            DataSource::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<ServerData> for DataSource {
    fn from(data: ServerData) -> Self {
        DataSource::Envelope(data)
    }
}

impl From<Value> for DataSource {
    fn from(value: Value) -> Self {
        DataSource::Json(value)
    }
}

/// Represents the chartisan construction options
#[derive(Clone, Debug)]
pub struct ChartisanOptions {
    /// Selector of the element to attach the chart to
    pub el: String,
    pub url: Option<String>,
    pub request: RequestInit,
    /// Static data, no request is performed when set
    pub data: Option<DataSource>,
    pub loader: LoaderOptions,
    pub error: ErrorOptions,
    /// Background of the overlay while it is visible
    pub overlay_color: String,
}

// Serializable part of the options, used when resolving from JSON
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedOptions {
    el: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "requestInit", alias = "request")]
    request: RequestInit,
    loader: LoaderOptions,
    error: ErrorOptions,
    overlay_color: String,
}

impl ChartisanOptions {
    pub fn new(defaults: &Defaults) -> Self {
        Self {
            el: defaults.el.clone(),
            url: None,
            request: RequestInit::default(),
            data: None,
            loader: defaults.loader.clone(),
            error: defaults.error.clone(),
            overlay_color: defaults.overlay_color.clone(),
        }
    }

    /// Resolve options from a partial JSON object.
    ///
    /// Top level keys replace the defaults; `loader` and `error` are merged
    /// key by key so a caller can override only the text, for example.
    /// Arrays (the `size` pairs) are replaced, not concatenated. Request
    /// options are read from `requestInit` (or `request`).
    pub fn from_json(partial: &Value, defaults: &Defaults) -> Result<Self> {
        let Some(partial) = partial.as_object() else {
            return Err(ChartisanError::Options("options must be an object".to_string()));
        };

        let mut resolved = json!({
            "el": defaults.el,
            "loader": serde_json::to_value(&defaults.loader)
                .map_err(|e| ChartisanError::Options(e.to_string()))?,
            "error": serde_json::to_value(&defaults.error)
                .map_err(|e| ChartisanError::Options(e.to_string()))?,
            "overlayColor": defaults.overlay_color,
        });

        let nested = MergeOptions::default().array_merge(ArrayMerge::Overwrite);
        for (key, value) in partial {
            match key.as_str() {
                "loader" | "error" => {
                    resolved[key.as_str()] = merge_with(&resolved[key.as_str()], value, &nested);
                }
                // Handled by the caller, these are not plain data
                "data" | "hooks" => {}
                _ => {
                    resolved[key.as_str()] = value.clone();
                }
            }
        }

        let resolved: ResolvedOptions = serde_json::from_value(resolved)
            .map_err(|e| ChartisanError::Options(e.to_string()))?;

        Ok(Self {
            el: resolved.el,
            url: resolved.url.filter(|url| !url.is_empty()),
            request: resolved.request,
            data: None,
            loader: resolved.loader,
            error: resolved.error,
            overlay_color: resolved.overlay_color,
        })
    }

    pub fn el(mut self, el: impl Into<String>) -> Self {
        self.el = el.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn request(mut self, request: RequestInit) -> Self {
        self.request = request;
        self
    }

    pub fn data(mut self, data: impl Into<DataSource>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn loader(mut self, loader: LoaderOptions) -> Self {
        self.loader = loader;
        self
    }

    pub fn error(mut self, error: ErrorOptions) -> Self {
        self.error = error;
        self
    }

    pub fn overlay_color(mut self, color: impl Into<String>) -> Self {
        self.overlay_color = color.into();
        self
    }
}

impl Default for ChartisanOptions {
    fn default() -> Self {
        Self::new(&DEFAULTS)
    }
}

/// Options to update the chart
#[derive(Clone, Debug, Default)]
pub struct UpdateOptions {
    /// Replaces the persisted url
    pub url: Option<String>,
    /// Replaces the persisted request options
    pub request: Option<RequestInit>,
    /// Static data. If set, no request is performed
    pub data: Option<DataSource>,
    /// Refresh without the loading overlay and hand the result to
    /// `on_background_update`
    pub background: bool,
    /// Passed through to the renderer untouched
    pub additional: Option<Value>,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn request(mut self, request: RequestInit) -> Self {
        self.request = Some(request);
        self
    }

    pub fn data(mut self, data: impl Into<DataSource>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn additional(mut self, additional: Value) -> Self {
        self.additional = Some(additional);
        self
    }
}

impl From<&ChartisanOptions> for UpdateOptions {
    fn from(options: &ChartisanOptions) -> Self {
        Self {
            url: options.url.clone(),
            request: Some(options.request.clone()),
            data: options.data.clone(),
            background: false,
            additional: None,
        }
    }
}
