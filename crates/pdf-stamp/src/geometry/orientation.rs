//! Page orientation normalization
//!
//! Positions are authored against a portrait reference page. When a document
//! mixes portrait pages with landscape ones, a stored position is re-expressed
//! on each landscape page by a quarter-turn remap so the annotation lands in
//! the analogous visual spot:
//!
//! ```text
//! page.x   = stored.y
//! page.y   = reference - stored.x - size
//! ```
//!
//! Uniformly portrait or uniformly landscape documents use stored positions
//! unchanged. The same [`PageFrame`] drives both the interactive preview and
//! the embedding generator.

use crate::types::{PageGeometry, Point};
use crate::units::{POINTS_PER_MM, REFERENCE_WIDTH_MM, page_points_per_mm};

/// Orientation facts for the whole document
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationNormalizer {
    pages: Vec<PageGeometry>,
    has_portrait: bool,
    reference_width_mm: f64,
}

impl OrientationNormalizer {
    pub fn new(pages: Vec<PageGeometry>, reference_width_mm: f64) -> Self {
        let has_portrait = pages.iter().any(PageGeometry::is_portrait);
        let reference_width_mm = if reference_width_mm.is_finite() && reference_width_mm > 0.0 {
            reference_width_mm
        } else {
            REFERENCE_WIDTH_MM
        };
        Self {
            pages,
            has_portrait,
            reference_width_mm,
        }
    }

    /// Normalizer using the A4 short edge as reference
    pub fn with_a4_reference(pages: Vec<PageGeometry>) -> Self {
        Self::new(pages, REFERENCE_WIDTH_MM)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageGeometry] {
        &self.pages
    }

    /// Whether any page in the document is portrait
    pub fn has_portrait(&self) -> bool {
        self.has_portrait
    }

    pub fn reference_width_mm(&self) -> f64 {
        self.reference_width_mm
    }

    /// Frame for a 1-based page number, `None` when out of range
    pub fn frame(&self, page_number: u32) -> Option<PageFrame> {
        let index = (page_number as usize).checked_sub(1)?;
        let geometry = *self.pages.get(index)?;
        let is_landscape = geometry.is_landscape();
        let mixed = self.has_portrait && is_landscape;

        // The reference edge is the short one: height on landscape pages, width otherwise
        let (eff_w, eff_h) = geometry.effective_dimensions_mm();
        let reference_edge_mm = if is_landscape { eff_h } else { eff_w };
        let pt_per_mm =
            page_points_per_mm(reference_edge_mm * POINTS_PER_MM, self.reference_width_mm);

        Some(PageFrame {
            page_number,
            geometry,
            mixed,
            pt_per_mm,
            reference_width_mm: self.reference_width_mm,
        })
    }
}

/// How one page maps stored document coordinates into its own space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub page_number: u32,
    pub geometry: PageGeometry,
    /// This page is landscape in a document that also has portrait pages
    pub mixed: bool,
    /// Points per document millimeter on this page
    pub pt_per_mm: f64,
    pub reference_width_mm: f64,
}

impl PageFrame {
    /// Map a stored position onto this page
    pub fn to_page(&self, stored: Point, size_mm: f64) -> Point {
        if self.mixed {
            Point::new(stored.y, self.reference_width_mm - stored.x - size_mm)
        } else {
            stored
        }
    }

    /// Map a position on this page back to the stored position
    pub fn to_stored(&self, on_page: Point, size_mm: f64) -> Point {
        if self.mixed {
            Point::new(self.reference_width_mm - on_page.y - size_mm, on_page.x)
        } else {
            on_page
        }
    }

    /// Convert document millimeters to points on this page
    pub fn mm_to_pt(&self, mm: f64) -> f64 {
        mm * self.pt_per_mm
    }

    /// Convert points on this page to document millimeters
    pub fn pt_to_mm(&self, pt: f64) -> f64 {
        pt / self.pt_per_mm
    }

    /// MediaBox width in points
    pub fn width_pt(&self) -> f64 {
        self.geometry.width_pt()
    }

    /// MediaBox height in points
    pub fn height_pt(&self) -> f64 {
        self.geometry.height_pt()
    }

    /// Displayed page width in points (after `/Rotate`)
    pub fn display_width_pt(&self) -> f64 {
        let (w, _) = self.geometry.effective_dimensions_mm();
        w * POINTS_PER_MM
    }

    /// Displayed page height in points (after `/Rotate`)
    pub fn display_height_pt(&self) -> f64 {
        let (_, h) = self.geometry.effective_dimensions_mm();
        h * POINTS_PER_MM
    }

    /// Displayed page width in document millimeters
    pub fn width_doc_mm(&self) -> f64 {
        let (w, _) = self.geometry.effective_dimensions_mm();
        self.pt_to_mm(w * POINTS_PER_MM)
    }

    /// Displayed page height in document millimeters
    pub fn height_doc_mm(&self) -> f64 {
        let (_, h) = self.geometry.effective_dimensions_mm();
        self.pt_to_mm(h * POINTS_PER_MM)
    }
}
