//! Rendering side of the controller
//!
//! The controller never draws charts itself. A concrete backend implements
//! [`Renderer`] and receives the validated, hook-transformed data; this module
//! also renders the loader and error placeholders shown in the overlay.

pub mod error;
pub mod loader;

use mustache::Template;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ChartisanError, Result};
use crate::models::data::ServerData;

pub use error::{render_error, REFRESH_CLASS};
pub use loader::render_loader;

/// Template compiled on first use. A compile failure is kept as text and
/// reported on every render.
pub(crate) type CompiledTemplate = Lazy<std::result::Result<Template, String>>;

pub(crate) fn render_template<T: Serialize>(template: &CompiledTemplate, context: &T) -> Result<String> {
    let template = template
        .as_ref()
        .map_err(|e| ChartisanError::Template(e.clone()))?;
    Ok(template.render_to_string(context)?)
}

/// Capability implemented by every chart backend.
///
/// `N` is the DOM node type the backend draws into (the shell body).
pub trait Renderer<N> {
    /// Backend specific chart model
    type Data;

    /// Convert the envelope into the backend model. Must be deterministic and
    /// total over any envelope accepted by the validator.
    fn format_data(&self, server: &ServerData) -> Self::Data;

    /// First render, or a foreground refresh
    fn on_update(&mut self, body: &N, data: Self::Data, extra: Option<&Value>);

    /// Refresh without visual disruption (no loader was shown)
    fn on_background_update(&mut self, body: &N, data: Self::Data, extra: Option<&Value>);

    /// Release backend resources
    fn destroy(&mut self, _body: &N) {}
}
