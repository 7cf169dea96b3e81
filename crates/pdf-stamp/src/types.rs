use crate::units::{mm_to_pt, pt_to_mm};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Error, Debug)]
pub enum StampError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Failed to load PDF: {0}")]
    PdfLoad(String),
    #[error("Asset {asset} is missing its image")]
    MissingAsset { asset: u64 },
    #[error("Asset {asset} could not be decoded: {source}")]
    AssetDecode {
        asset: u64,
        #[source]
        source: image::ImageError,
    },
    #[error("Document has no pages")]
    NoPages,
}

pub type Result<T> = std::result::Result<T, StampError>;

/// A point in document space (millimeters, origin top-left, y down)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// True when both coordinates agree within `tolerance`
    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

/// Per-page facts read from the PDF, never from rendered layout
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PageGeometry {
    /// MediaBox width in millimeters (unrotated)
    pub width_mm: f64,
    /// MediaBox height in millimeters (unrotated)
    pub height_mm: f64,
    /// Page `/Rotate` value reduced to 0, 90, 180 or 270
    pub rotation_angle: u16,
}

impl PageGeometry {
    pub fn new(width_mm: f64, height_mm: f64, rotation_angle: i64) -> Self {
        // /Rotate must be a multiple of 90; anything else is treated as unrotated
        let rotation_angle = match rotation_angle.rem_euclid(360) {
            r @ (0 | 90 | 180 | 270) => r as u16,
            _ => 0,
        };
        Self {
            width_mm,
            height_mm,
            rotation_angle,
        }
    }

    /// Build from MediaBox dimensions in points
    pub fn from_points(width_pt: f64, height_pt: f64, rotation_angle: i64) -> Self {
        Self::new(pt_to_mm(width_pt), pt_to_mm(height_pt), rotation_angle)
    }

    pub fn width_pt(&self) -> f64 {
        mm_to_pt(self.width_mm)
    }

    pub fn height_pt(&self) -> f64 {
        mm_to_pt(self.height_mm)
    }

    /// Whether the page's `/Rotate` turns it a quarter turn
    pub fn is_quarter_turned(&self) -> bool {
        matches!(self.rotation_angle, 90 | 270)
    }

    /// Displayed (width, height) in millimeters after applying `/Rotate`
    pub fn effective_dimensions_mm(&self) -> (f64, f64) {
        if self.is_quarter_turned() {
            (self.height_mm, self.width_mm)
        } else {
            (self.width_mm, self.height_mm)
        }
    }

    /// Wider than tall as displayed
    pub fn is_landscape(&self) -> bool {
        let (w, h) = self.effective_dimensions_mm();
        w > h
    }

    /// Narrower than tall as displayed
    pub fn is_portrait(&self) -> bool {
        let (w, h) = self.effective_dimensions_mm();
        w < h
    }
}
