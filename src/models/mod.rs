//! Models module for Chartisan
//!
//! The server data envelope, controller options and chart state.

pub mod data;
pub mod options;
pub mod state;

// Re-export commonly used types
pub use data::*;
pub use options::{
    ChartisanOptions, DataSource, Defaults, ErrorKind, ErrorOptions, LoaderKind, LoaderOptions,
    RequestInit, UpdateOptions, DEFAULTS,
};
pub use state::ChartState;
