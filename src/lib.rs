//! Chartisan WASM Module
//!
//! Embeddable chart widget controller. It mounts a small DOM shell under a
//! page element, acquires chart data (static or over HTTP), validates the
//! server envelope, runs the formatting hooks and hands the result to a
//! pluggable rendering backend, showing loader and error overlays along
//! the way.

pub mod controller;
pub mod error;
pub mod fetch;
pub mod hooks;
pub mod models;
pub mod renderers;
pub mod runtime;
pub mod shell;
pub mod utils;

#[cfg(target_arch = "wasm32")]
pub mod api;

// Re-export commonly used types
pub use controller::Chartisan;
pub use error::{ChartisanError, Result};
pub use hooks::{HookContext, Hooks};
pub use models::*;
pub use renderers::Renderer;
pub use runtime::Runtime;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if let Err(err) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&format!("logger already initialized: {}", err).into());
    }

    log::info!("Chartisan WASM module initialized");
}
