//! Geometry shared by the preview and the embedding generator
//!
//! - Rotation bounds (container box of a rotated asset)
//! - Page orientation normalization (mixed portrait/landscape documents)
//! - Straddle slicing (one stamp split across pages)

mod bounds;
mod orientation;
mod straddle;

pub use bounds::*;
pub use orientation::*;
pub use straddle::*;
