//! Utility modules for the chart controller
//!
//! Option merging and the default color palette.

pub mod merge;
pub mod palette;

// Re-export commonly used items
pub use merge::{merge, merge_all, merge_with, ArrayMerge, MergeOptions};
pub use palette::{palette_color, COLOR_PALETTE};
