//! Rasterization of placed assets
//!
//! Each placement is drawn into a bitmap the size of its rotated bounding
//! box. The PDF then receives an axis-aligned image and needs no rotation of
//! its own, which keeps the output identical to the preview.

use crate::geometry::{StraddleSlice, rotated_bounds, straddle_slices};
use crate::model::Placement;
use crate::units::mm_to_raster_px;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

/// Render `source` at the placement's size and rotation.
///
/// The result's dimensions correspond to the placement's container; the asset
/// sits centered in it and the uncovered corners are transparent.
pub fn rasterize(source: &RgbaImage, placement: &Placement, dpi: f64) -> RgbaImage {
    let (base_w_mm, base_h_mm) = placement.base_dimensions();
    let base_w = to_pixels(mm_to_raster_px(base_w_mm, dpi));
    let base_h = to_pixels(mm_to_raster_px(base_h_mm, dpi));

    let resized = imageops::resize(source, base_w, base_h, FilterType::Lanczos3);

    let rotation = placement.rotation();
    match rotation {
        r if r == 0.0 => resized,
        r if r == 90.0 => imageops::rotate90(&resized),
        r if r == 180.0 => imageops::rotate180(&resized),
        r if r == 270.0 => imageops::rotate270(&resized),
        _ => rotate_into_container(&resized, rotation),
    }
}

/// Rotate clockwise by an arbitrary angle into a canvas sized to the bounds
fn rotate_into_container(image: &RgbaImage, degrees: f64) -> RgbaImage {
    let (w, h) = image.dimensions();
    let bounds = rotated_bounds(f64::from(w), f64::from(h), degrees);
    let canvas_w = to_pixels(bounds.width);
    let canvas_h = to_pixels(bounds.height);

    // Rotate about the asset's center, then move that center to the canvas center
    let projection = Projection::translate(-(w as f32) / 2.0, -(h as f32) / 2.0)
        .and_then(Projection::rotate(degrees.to_radians() as f32))
        .and_then(Projection::translate(
            canvas_w as f32 / 2.0,
            canvas_h as f32 / 2.0,
        ));

    let mut canvas = RgbaImage::new(canvas_w, canvas_h);
    warp_into(
        image,
        &projection,
        Interpolation::Bicubic,
        Rgba([0, 0, 0, 0]),
        &mut canvas,
    );
    canvas
}

/// Cut a rendered straddle stamp into one strip per page.
///
/// Empty strips (a stamp narrower than the page count) come back as `None`.
pub fn split_straddle(
    image: &RgbaImage,
    total_pages: u32,
) -> Vec<(StraddleSlice, Option<RgbaImage>)> {
    straddle_slices(total_pages, image.width())
        .into_iter()
        .map(|slice| {
            let part = (slice.width_px > 0).then(|| {
                imageops::crop_imm(image, slice.offset_px, 0, slice.width_px, image.height())
                    .to_image()
            });
            (slice, part)
        })
        .collect()
}

fn to_pixels(value: f64) -> u32 {
    if value.is_finite() {
        value.round().max(1.0) as u32
    } else {
        1
    }
}
