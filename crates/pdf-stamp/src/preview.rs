//! Screen-space adapter for the interactive preview
//!
//! The preview draws each placement as a draggable, resizable, rotatable box
//! over a page rendered at `zoom × render_scale`. This adapter converts that
//! box to and from the placement model. It never keeps its own copy of the
//! geometry: every render is computed from the model, so rendering the same
//! state twice yields the same box.

use crate::geometry::{OrientationNormalizer, PageFrame, StraddleSlice, straddle_slice};
use crate::model::{ConfigId, Placement, PlacementModel, Target};
use crate::types::{PageGeometry, Point};
use crate::options::GenerationOptions;
use crate::units::Viewport;

/// A rectangle in screen pixels relative to the page's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// What the preview draws for one placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewBox {
    /// The rotated bounding box (drag/resize handle area)
    pub container: ScreenRect,
    /// The unrotated asset inside the container, before the CSS-style rotation
    pub asset: ScreenRect,
    /// Clockwise rotation in degrees applied to `asset` about its center
    pub rotation: f64,
    pub opacity: f32,
}

/// What the preview draws for one page of a straddle stamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraddlePreview {
    /// Visible slice box, flush with the page's right edge
    pub clip_box: ScreenRect,
    /// Full-width stamp box positioned so only this page's slice is visible
    pub stamp: ScreenRect,
    pub slice: StraddleSlice,
    pub rotation: f64,
    pub opacity: f32,
}

/// Converts pointer gestures into model edits and model state into boxes
#[derive(Debug, Clone)]
pub struct PreviewAdapter {
    viewport: Viewport,
    normalizer: OrientationNormalizer,
    opacity: f32,
}

impl PreviewAdapter {
    /// Adapter for a document, using the same options the output will be generated with
    pub fn new(pages: Vec<PageGeometry>, options: &GenerationOptions, viewport: Viewport) -> Self {
        Self {
            viewport,
            normalizer: options.normalizer(pages),
            opacity: options.opacity,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.viewport.zoom = zoom;
        } else {
            log::warn!("Ignoring invalid zoom {}", zoom);
        }
    }

    pub fn set_render_scale(&mut self, render_scale: f64) {
        if render_scale.is_finite() && render_scale > 0.0 {
            self.viewport.render_scale = render_scale;
        } else {
            log::warn!("Ignoring invalid render scale {}", render_scale);
        }
    }

    pub fn normalizer(&self) -> &OrientationNormalizer {
        &self.normalizer
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    fn frame(&self, page_number: u32) -> Option<PageFrame> {
        let frame = self.normalizer.frame(page_number);
        if frame.is_none() {
            log::warn!("Page {} is not in the document", page_number);
        }
        frame
    }

    /// Page size on screen in pixels (displayed orientation)
    pub fn page_size_px(&self, page_number: u32) -> Option<(f64, f64)> {
        let frame = self.frame(page_number)?;
        let px_per_mm = self.viewport.px_per_mm(frame.pt_per_mm);
        Some((
            frame.width_doc_mm() * px_per_mm,
            frame.height_doc_mm() * px_per_mm,
        ))
    }

    /// Screen box for a placement on a page
    pub fn render(
        &self,
        model: &PlacementModel,
        target: Target,
        page_number: u32,
    ) -> Option<PreviewBox> {
        let placement = model.placement(target)?;
        let frame = self.frame(page_number)?;
        Some(self.render_placement(placement, &frame))
    }

    fn render_placement(&self, placement: &Placement, frame: &PageFrame) -> PreviewBox {
        let px_per_mm = self.viewport.px_per_mm(frame.pt_per_mm);
        let on_page = frame.to_page(placement.position(), placement.size_mm());
        let (cw, ch) = placement.container_dimensions();
        let (bw, bh) = placement.base_dimensions();
        let bounds = placement.bounds();

        PreviewBox {
            container: ScreenRect::new(
                on_page.x * px_per_mm,
                on_page.y * px_per_mm,
                cw * px_per_mm,
                ch * px_per_mm,
            ),
            asset: ScreenRect::new(
                bounds.offset_x * px_per_mm,
                bounds.offset_y * px_per_mm,
                bw * px_per_mm,
                bh * px_per_mm,
            ),
            rotation: placement.rotation(),
            opacity: self.opacity,
        }
    }

    /// Apply a finished drag of `(dx, dy)` screen pixels.
    ///
    /// The delta moves the container corner in the page's own frame; on a
    /// mixed-orientation page the result is mapped back to stored coordinates.
    pub fn drag_end(
        &self,
        model: &mut PlacementModel,
        target: Target,
        page_number: u32,
        dx_px: f64,
        dy_px: f64,
    ) -> bool {
        let Some(frame) = self.frame(page_number) else {
            return false;
        };
        let Some(placement) = model.placement(target).copied() else {
            log::warn!("Drag ended on unknown {}", target);
            return false;
        };

        let px_per_mm = self.viewport.px_per_mm(frame.pt_per_mm);
        let size = placement.size_mm();
        let on_page = frame
            .to_page(placement.position(), size)
            .offset(dx_px / px_per_mm, dy_px / px_per_mm);
        model.update_position(target, frame.to_stored(on_page, size))
    }

    /// Move a placement so its container's top-left sits at a screen point
    pub fn move_to(
        &self,
        model: &mut PlacementModel,
        target: Target,
        page_number: u32,
        left_px: f64,
        top_px: f64,
    ) -> bool {
        let Some(frame) = self.frame(page_number) else {
            return false;
        };
        let Some(size) = model.placement(target).map(Placement::size_mm) else {
            log::warn!("Move requested for unknown {}", target);
            return false;
        };
        let px_per_mm = self.viewport.px_per_mm(frame.pt_per_mm);
        let on_page = Point::new(left_px / px_per_mm, top_px / px_per_mm);
        model.update_position(target, frame.to_stored(on_page, size))
    }

    /// Apply a finished resize that left the container `new_width_px` wide
    pub fn resize_end(
        &self,
        model: &mut PlacementModel,
        target: Target,
        page_number: u32,
        new_width_px: f64,
    ) -> bool {
        let Some(frame) = self.frame(page_number) else {
            return false;
        };
        let Some(placement) = model.placement(target).copied() else {
            log::warn!("Resize ended on unknown {}", target);
            return false;
        };
        let px_per_mm = self.viewport.px_per_mm(frame.pt_per_mm);
        let size = placement.size_for_container_width(new_width_px / px_per_mm);
        model.update_size(target, size)
    }

    /// Set an absolute rotation
    pub fn rotate(&self, model: &mut PlacementModel, target: Target, degrees: f64) -> bool {
        model.update_rotation(target, degrees)
    }

    /// Rotate relative to the current angle (the rotate button uses 90°)
    pub fn rotate_by(&self, model: &mut PlacementModel, target: Target, delta: f64) -> bool {
        let Some(current) = model.placement(target).map(Placement::rotation) else {
            log::warn!("Rotation requested for unknown {}", target);
            return false;
        };
        model.update_rotation(target, current + delta)
    }

    /// Slice of a straddle config shown on a page
    pub fn straddle_preview(
        &self,
        model: &PlacementModel,
        config_id: ConfigId,
        page_number: u32,
    ) -> Option<StraddlePreview> {
        let config = model.config(config_id)?;
        if !config.straddle {
            return None;
        }
        let frame = self.frame(page_number)?;
        let total_pages = u32::try_from(self.normalizer.page_count()).ok()?;

        let px_per_mm = self.viewport.px_per_mm(frame.pt_per_mm);
        let (cw, ch) = config.placement.container_dimensions();
        let stamp_width_px = (cw * px_per_mm).round() as u32;
        let slice = straddle_slice(page_number, total_pages, stamp_width_px)?;

        let page_width_px = frame.width_doc_mm() * px_per_mm;
        let top = config.straddle_y_mm * px_per_mm;
        let slice_width = f64::from(slice.width_px);
        let left = page_width_px - slice_width;

        Some(StraddlePreview {
            clip_box: ScreenRect::new(left, top, slice_width, ch * px_per_mm),
            stamp: ScreenRect::new(
                left + slice.translate_x_px(),
                top,
                f64::from(stamp_width_px),
                ch * px_per_mm,
            ),
            slice,
            rotation: config.placement.rotation(),
            opacity: self.opacity,
        })
    }
}
