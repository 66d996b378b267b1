//! Chart lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the states of the chart
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartState {
    /// Constructed, no acquisition started yet
    #[default]
    Initializing,
    /// Acquisition in flight, loader overlay visible
    Loading,
    /// Last acquisition failed, error overlay visible
    Error,
    /// Last acquisition succeeded, overlay hidden
    Show,
}

impl ChartState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartState::Initializing => "initializing",
            ChartState::Loading => "loading",
            ChartState::Error => "error",
            ChartState::Show => "show",
        }
    }
}

impl fmt::Display for ChartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
