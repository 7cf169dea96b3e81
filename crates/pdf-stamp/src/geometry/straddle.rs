//! Straddle (crossing-page) stamp slicing
//!
//! A straddle stamp is one seal split into vertical strips, one per page,
//! each strip placed flush against the page's right edge. Laid side by side
//! the pages reassemble the full seal.

/// The part of a straddle stamp a single page shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraddleSlice {
    /// 1-based page number
    pub page_number: u32,
    pub total_pages: u32,
    /// Full stamp width in pixels
    pub stamp_width_px: u32,
    /// Left edge of this slice within the stamp
    pub offset_px: u32,
    /// Width of this slice
    pub width_px: u32,
}

impl StraddleSlice {
    /// Start of the visible range as a percentage of the stamp width
    pub fn clip_start_pct(&self) -> f64 {
        self.pct(self.offset_px)
    }

    /// End of the visible range as a percentage of the stamp width
    pub fn clip_end_pct(&self) -> f64 {
        if self.page_number == self.total_pages {
            100.0
        } else {
            self.pct(self.offset_px + self.width_px)
        }
    }

    /// Clip inset from the stamp's left edge
    pub fn inset_left_pct(&self) -> f64 {
        self.clip_start_pct()
    }

    /// Clip inset from the stamp's right edge
    pub fn inset_right_pct(&self) -> f64 {
        100.0 - self.clip_end_pct()
    }

    /// Horizontal translate that brings this slice to the origin of its box
    pub fn translate_x_px(&self) -> f64 {
        -f64::from(self.offset_px)
    }

    /// Fraction of the stamp this slice covers
    pub fn width_fraction(&self) -> f64 {
        if self.stamp_width_px == 0 {
            0.0
        } else {
            f64::from(self.width_px) / f64::from(self.stamp_width_px)
        }
    }

    fn pct(&self, px: u32) -> f64 {
        if self.stamp_width_px == 0 {
            return 0.0;
        }
        f64::from(px) / f64::from(self.stamp_width_px) * 100.0
    }
}

/// Compute the slice for `page_number` (1-based) of `total_pages`.
///
/// Every slice but the last is `floor(width / total_pages)` wide; the last
/// one absorbs the remainder so the slices always sum to the full width.
pub fn straddle_slice(
    page_number: u32,
    total_pages: u32,
    stamp_width_px: u32,
) -> Option<StraddleSlice> {
    if total_pages == 0 || page_number == 0 || page_number > total_pages {
        return None;
    }

    let base = stamp_width_px / total_pages;
    let offset_px = base * (page_number - 1);
    let width_px = if page_number == total_pages {
        stamp_width_px - offset_px
    } else {
        base
    };

    Some(StraddleSlice {
        page_number,
        total_pages,
        stamp_width_px,
        offset_px,
        width_px,
    })
}

/// All slices for a document, in page order
pub fn straddle_slices(total_pages: u32, stamp_width_px: u32) -> Vec<StraddleSlice> {
    (1..=total_pages)
        .filter_map(|page| straddle_slice(page, total_pages, stamp_width_px))
        .collect()
}

/// Nominal slice width in document millimeters
pub fn slice_width_mm(size_mm: f64, total_pages: u32) -> f64 {
    if total_pages == 0 {
        return 0.0;
    }
    size_mm / f64::from(total_pages)
}
