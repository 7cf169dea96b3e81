//! Placement and embedding of seal and signature images into PDF pages.
//!
//! The crate is split along the path an annotation takes:
//!
//! - [`model`] holds assets, configs and instances with their geometry
//! - [`geometry`] maps that geometry onto concrete pages
//! - [`preview`] converts it to and from screen pixels
//! - [`embed`] rasterizes it into a new PDF

pub mod embed;
pub mod geometry;
pub mod model;
mod options;
pub mod preview;
mod types;
pub mod units;

pub use embed::{EmbedWarning, EmbeddingGenerator, GeneratedPdf, GenerationState};
pub use model::{
    Asset, AssetId, Config, ConfigId, ConfigSpec, Instance, InstanceId, Placement, PlacementMode,
    PlacementModel, Target,
};
pub use options::*;
pub use preview::{PreviewAdapter, PreviewBox, ScreenRect, StraddlePreview};
pub use types::*;
pub use units::Viewport;
