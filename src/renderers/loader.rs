//! Loader placeholder markup
//!
//! Rendered into the overlay while an acquisition is in flight.

use once_cell::sync::Lazy;
use serde::Serialize;

use super::{render_template, CompiledTemplate};
use crate::error::Result;
use crate::models::options::{LoaderKind, LoaderOptions};

/// Context for the animation templates
#[derive(Debug, Clone, Serialize)]
pub(crate) struct IconContext<'a> {
    pub width: u32,
    pub height: u32,
    pub color: &'a str,
}

#[derive(Debug, Serialize)]
struct LoaderContext<'a> {
    icon: String,
    has_text: bool,
    text: &'a str,
    text_color: &'a str,
}

static BAR_ICON: CompiledTemplate =
    Lazy::new(|| mustache::compile_str(get_loader_icon(LoaderKind::Bar)).map_err(|e| e.to_string()));
static INFINITE_ICON: CompiledTemplate = Lazy::new(|| {
    mustache::compile_str(get_loader_icon(LoaderKind::Infinite)).map_err(|e| e.to_string())
});
static LOADER_TEMPLATE: CompiledTemplate = Lazy::new(|| {
    mustache::compile_str(include_str!("templates/loader.html.mustache")).map_err(|e| e.to_string())
});

fn icon_template(kind: LoaderKind) -> &'static CompiledTemplate {
    match kind {
        LoaderKind::Bar => &BAR_ICON,
        LoaderKind::Infinite => &INFINITE_ICON,
    }
}

/// Get the animation template by type
pub fn get_loader_icon(kind: LoaderKind) -> &'static str {
    match kind {
        LoaderKind::Bar => include_str!("templates/bar.svg.mustache"),
        LoaderKind::Infinite => include_str!("templates/infinite.svg.mustache"),
    }
}

/// Render the loader markup for the given options
pub fn render_loader(options: &LoaderOptions) -> Result<String> {
    let icon = render_template(
        icon_template(options.kind),
        &IconContext {
            width: options.size.0,
            height: options.size.1,
            color: &options.color,
        },
    )?;

    let context = LoaderContext {
        icon,
        has_text: !options.text.is_empty(),
        text: &options.text,
        text_color: &options.text_color,
    };
    render_template(&LOADER_TEMPLATE, &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::options::DEFAULTS;

    #[test]
    fn test_templates_compile() {
        assert!(BAR_ICON.is_ok());
        assert!(INFINITE_ICON.is_ok());
        assert!(LOADER_TEMPLATE.is_ok());
    }

    #[test]
    fn test_render_default_loader() {
        let html = render_loader(&DEFAULTS.loader).unwrap();
        assert!(html.contains("chartisan-help-block"));
        assert!(html.contains("width=\"35\""));
        assert!(html.contains("fill=\"#000\""));
        assert!(html.contains("Loading chart"));
        assert!(html.contains("color: #a0aec0;"));
    }

    #[test]
    fn test_render_infinite_loader_without_text() {
        let mut options = DEFAULTS.loader.clone();
        options.kind = LoaderKind::Infinite;
        options.text = String::new();
        options.color = "#667EEA".to_string();

        let html = render_loader(&options).unwrap();
        assert!(html.contains("stroke=\"#667EEA\""));
        assert!(html.contains("stroke-dasharray"));
        assert!(!html.contains("chartisan-help-text"));
    }
}
