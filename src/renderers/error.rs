//! Error placeholder markup
//!
//! The icon is wrapped in the `chartisan-refresh-chart` element the
//! controller binds its retry handler to.

use once_cell::sync::Lazy;
use serde::Serialize;

use super::loader::IconContext;
use super::{render_template, CompiledTemplate};
use crate::error::Result;
use crate::models::options::{ErrorKind, ErrorOptions};

/// Class of the retry affordance inside the error markup
pub const REFRESH_CLASS: &str = "chartisan-refresh-chart";

#[derive(Debug, Serialize)]
struct ErrorContext<'a> {
    icon: String,
    has_text: bool,
    text: &'a str,
    text_color: &'a str,
    debug: bool,
    message: &'a str,
}

static GENERAL_ICON: CompiledTemplate = Lazy::new(|| {
    mustache::compile_str(get_error_icon(ErrorKind::General)).map_err(|e| e.to_string())
});
static ERROR_TEMPLATE: CompiledTemplate = Lazy::new(|| {
    mustache::compile_str(include_str!("templates/error.html.mustache")).map_err(|e| e.to_string())
});

/// Get the icon template by type
pub fn get_error_icon(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::General => include_str!("templates/general.svg.mustache"),
    }
}

/// Render the error markup. `message` is only included (escaped) when the
/// options have `debug` on.
pub fn render_error(options: &ErrorOptions, message: &str) -> Result<String> {
    let icon = match options.kind {
        ErrorKind::General => &GENERAL_ICON,
    };
    let icon = render_template(
        icon,
        &IconContext {
            width: options.size.0,
            height: options.size.1,
            color: &options.color,
        },
    )?;

    let context = ErrorContext {
        icon,
        has_text: !options.text.is_empty(),
        text: &options.text,
        text_color: &options.text_color,
        debug: options.debug,
        message,
    };
    render_template(&ERROR_TEMPLATE, &context)
}
