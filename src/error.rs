//! Error types for the chart controller
//!
//! Mount and option errors escape construction. Everything that can go wrong
//! while acquiring data is routed to the `Error` state instead.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = ChartisanError> = std::result::Result<T, E>;

/// Top-level controller error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartisanError {
    /// No element matches the configured mount selector (fatal)
    #[error("[Chartisan] Unable to find an element to bind the chart to a DOM element with the selector = '{selector}'")]
    MountTargetNotFound { selector: String },

    /// Neither a url nor static data was available at acquisition time
    #[error("No url or data was given to fetch the chart data")]
    MissingUrl,

    /// The payload does not satisfy the envelope shape
    #[error("Invalid server data: {0}")]
    InvalidData(String),

    /// Transport or JSON parse failure
    #[error("Network error: {0}")]
    Network(String),

    /// `merge_all` was given something other than an array
    #[error("first argument should be an array")]
    MergeArgument,

    /// A pipeline hook failed
    #[error("Hook failed: {0}")]
    Hook(String),

    /// The DOM rejected an operation
    #[error("DOM error: {0}")]
    Dom(String),

    /// Placeholder markup could not be rendered
    #[error("Template error: {0}")]
    Template(String),

    /// Construction options could not be resolved
    #[error("Invalid options: {0}")]
    Options(String),
}

impl ChartisanError {
    /// Whether this error is raised while acquiring data (and therefore
    /// shown in the overlay rather than returned to the caller)
    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self,
            ChartisanError::MissingUrl
                | ChartisanError::InvalidData(_)
                | ChartisanError::Network(_)
                | ChartisanError::Hook(_)
        )
    }
}

impl From<mustache::Error> for ChartisanError {
    fn from(err: mustache::Error) -> Self {
        ChartisanError::Template(err.to_string())
    }
}

impl From<serde_json::Error> for ChartisanError {
    fn from(err: serde_json::Error) -> Self {
        ChartisanError::InvalidData(err.to_string())
    }
}
