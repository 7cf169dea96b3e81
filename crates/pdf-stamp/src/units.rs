//! Unit conversion between document, page, and screen space
//!
//! Document space is millimeters (top-left origin), page space is PDF points
//! (bottom-left origin), and screen space is device pixels under the preview's
//! zoom and fixed render scale. Every conversion in the crate goes through
//! this module so the preview and the generated PDF share one set of factors.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// =============================================================================
// Length Units
// =============================================================================

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Points per inch (PDF user space unit)
pub const POINTS_PER_INCH: f64 = 72.0;

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f64 = POINTS_PER_INCH / MM_PER_INCH; // ≈ 2.83465

/// Device pixels per point before zoom; the preview rasterizes pages at 72 DPI.
pub const PX_PER_PT: f64 = 1.0;

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * POINTS_PER_MM
}

/// Convert points to millimeters
#[inline]
pub fn pt_to_mm(pt: f64) -> f64 {
    pt / POINTS_PER_MM
}

/// Convert millimeters to on-screen pixels.
///
/// `render_scale` is the fixed factor the preview applies to fit pages on
/// screen; it multiplies with the interactive `zoom`.
#[inline]
pub fn mm_to_px(mm: f64, zoom: f64, render_scale: f64) -> f64 {
    mm * POINTS_PER_MM * PX_PER_PT * zoom * render_scale
}

/// Convert on-screen pixels back to millimeters
#[inline]
pub fn px_to_mm(px: f64, zoom: f64, render_scale: f64) -> f64 {
    px / (POINTS_PER_MM * PX_PER_PT * zoom * render_scale)
}

/// Convert millimeters to raster pixels at the given DPI
#[inline]
pub fn mm_to_raster_px(mm: f64, dpi: f64) -> f64 {
    mm / MM_PER_INCH * dpi
}

// =============================================================================
// Reference Page
// =============================================================================

/// Short edge of the reference page (A4 portrait width) in millimeters.
///
/// Positions are authored against this edge; each page maps it onto its own
/// short edge when converting to points.
pub const REFERENCE_WIDTH_MM: f64 = 210.0;

/// Long edge of the reference page (A4 portrait height) in millimeters
pub const REFERENCE_HEIGHT_MM: f64 = 297.0;

/// Points per document millimeter on a page whose reference edge is
/// `reference_edge_pt` points long.
///
/// For an A4 page this is exactly [`POINTS_PER_MM`].
#[inline]
pub fn page_points_per_mm(reference_edge_pt: f64, reference_width_mm: f64) -> f64 {
    if reference_edge_pt > 0.0 && reference_width_mm > 0.0 {
        reference_edge_pt / reference_width_mm
    } else {
        POINTS_PER_MM
    }
}

// =============================================================================
// Placement Limits
// =============================================================================

/// Default asset size (longest edge) in millimeters
pub const DEFAULT_SIZE_MM: f64 = 40.0;

/// Smallest allowed asset size in millimeters
pub const MIN_SIZE_MM: f64 = 10.0;

/// Largest allowed asset size in millimeters
pub const MAX_SIZE_MM: f64 = 100.0;

/// Opacity of embedded annotations; matches the preview transparency.
pub const ANNOTATION_OPACITY: f32 = 0.8;

/// Default raster resolution for rasterized annotations
pub const DEFAULT_RASTER_DPI: f64 = 300.0;

// =============================================================================
// Viewport
// =============================================================================

/// Screen scaling applied by the interactive preview
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Viewport {
    /// Interactive zoom chosen by the user (1.0 = 100%)
    pub zoom: f64,
    /// Fixed factor the preview renders pages at to fit the screen
    pub render_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            render_scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(zoom: f64, render_scale: f64) -> Self {
        Self { zoom, render_scale }
    }

    /// Screen pixels per document millimeter on a page with the given ratio
    pub fn px_per_mm(&self, pt_per_mm: f64) -> f64 {
        pt_per_mm * PX_PER_PT * self.zoom * self.render_scale
    }

    /// Screen pixels per PDF point
    pub fn px_per_pt(&self) -> f64 {
        PX_PER_PT * self.zoom * self.render_scale
    }

    pub fn mm_to_px(&self, mm: f64) -> f64 {
        mm_to_px(mm, self.zoom, self.render_scale)
    }

    pub fn px_to_mm(&self, px: f64) -> f64 {
        px_to_mm(px, self.zoom, self.render_scale)
    }
}
