//! Axis-aligned bounds of a rotated rectangle

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bounding box that fully contains a rotated asset, plus the offset at which
/// the unrotated asset must be drawn so that it sits centered inside the box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotatedBounds {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl RotatedBounds {
    pub fn center_x(&self) -> f64 {
        self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.height / 2.0
    }
}

/// Reduce an angle in degrees to `[0, 360)`.
///
/// Non-finite input collapses to 0 so downstream trigonometry stays total.
pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// |sin θ| and |cos θ| for an angle in degrees.
///
/// Quarter turns return exact values so 90° and 270° swap width and height
/// without floating-point residue.
fn abs_sin_cos(degrees: f64) -> (f64, f64) {
    let degrees = normalize_rotation(degrees);
    if degrees % 90.0 == 0.0 {
        if (degrees as u32 / 90) % 2 == 0 {
            (0.0, 1.0)
        } else {
            (1.0, 0.0)
        }
    } else {
        let (sin, cos) = degrees.to_radians().sin_cos();
        (sin.abs(), cos.abs())
    }
}

/// Compute the bounding box of a `width` × `height` rectangle rotated by
/// `degrees` about its center.
pub fn rotated_bounds(width: f64, height: f64, degrees: f64) -> RotatedBounds {
    let (sin, cos) = abs_sin_cos(degrees);
    let new_width = width * cos + height * sin;
    let new_height = width * sin + height * cos;

    RotatedBounds {
        width: new_width,
        height: new_height,
        offset_x: (new_width - width) / 2.0,
        offset_y: (new_height - height) / 2.0,
    }
}

/// Factor `k` such that `rotated_bounds(size * kw, size * kh, θ).width == size * k`.
///
/// Used to recover an asset size from a resized bounding box width.
pub fn width_factor(unit_width: f64, unit_height: f64, degrees: f64) -> f64 {
    let (sin, cos) = abs_sin_cos(degrees);
    unit_width * cos + unit_height * sin
}
