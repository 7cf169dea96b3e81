//! The geometry record shared by configs and instances

use super::asset::base_dimensions;
use crate::geometry::{RotatedBounds, normalize_rotation, rotated_bounds, width_factor};
use crate::types::Point;
use crate::units::{DEFAULT_SIZE_MM, MAX_SIZE_MM, MIN_SIZE_MM};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clamp an asset size to the supported range; non-finite input becomes the default.
pub fn clamp_size(size_mm: f64) -> f64 {
    if size_mm.is_finite() {
        size_mm.clamp(MIN_SIZE_MM, MAX_SIZE_MM)
    } else {
        DEFAULT_SIZE_MM
    }
}

/// Size, rotation and position of one placed asset.
///
/// `position` is the top-left corner of the rotated bounding box (the
/// container), not of the asset itself. The container always equals
/// [`rotated_bounds`] of the base dimensions at the current rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    size_mm: f64,
    rotation: f64,
    position: Point,
    aspect_ratio: f64,
    base_width: f64,
    base_height: f64,
    container_width: f64,
    container_height: f64,
}

impl Placement {
    pub fn new(size_mm: f64, rotation: f64, position: Point, aspect_ratio: f64) -> Self {
        let mut placement = Self {
            size_mm: clamp_size(size_mm),
            rotation: normalize_rotation(rotation),
            position: if position.is_finite() {
                position
            } else {
                Point::default()
            },
            aspect_ratio,
            base_width: 0.0,
            base_height: 0.0,
            container_width: 0.0,
            container_height: 0.0,
        };
        placement.recompute();
        placement
    }

    /// Longest edge of the unrotated asset in millimeters
    pub fn size_mm(&self) -> f64 {
        self.size_mm
    }

    /// Rotation in degrees, always within `[0, 360)`
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Top-left of the container in document millimeters
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Unrotated asset (width, height) in millimeters
    pub fn base_dimensions(&self) -> (f64, f64) {
        (self.base_width, self.base_height)
    }

    /// Container (width, height) in millimeters
    pub fn container_dimensions(&self) -> (f64, f64) {
        (self.container_width, self.container_height)
    }

    /// Container bounds with the draw offsets of the unrotated asset
    pub fn bounds(&self) -> RotatedBounds {
        rotated_bounds(self.base_width, self.base_height, self.rotation)
    }

    /// Visual center of the asset in document millimeters
    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.container_width / 2.0,
            self.position.y + self.container_height / 2.0,
        )
    }

    /// Rotate about the visual center.
    pub(crate) fn set_rotation(&mut self, degrees: f64) {
        let center = self.center();
        self.rotation = normalize_rotation(degrees);
        self.recompute();
        self.position = Point::new(
            center.x - self.container_width / 2.0,
            center.y - self.container_height / 2.0,
        );
    }

    /// Change the size keeping the container's top-left corner and the rotation.
    pub(crate) fn set_size(&mut self, size_mm: f64) {
        self.size_mm = clamp_size(size_mm);
        self.recompute();
    }

    /// Size whose container at the current rotation would be `container_width` wide
    pub(crate) fn size_for_container_width(&self, container_width: f64) -> f64 {
        let (unit_w, unit_h) = base_dimensions(1.0, self.aspect_ratio);
        let factor = width_factor(unit_w, unit_h, self.rotation);
        if factor > 0.0 {
            container_width / factor
        } else {
            self.size_mm
        }
    }

    /// Returns false (and leaves the placement untouched) for non-finite input.
    pub(crate) fn set_position(&mut self, position: Point) -> bool {
        if !position.is_finite() {
            return false;
        }
        self.position = position;
        true
    }

    fn recompute(&mut self) {
        let (w, h) = base_dimensions(self.size_mm, self.aspect_ratio);
        self.base_width = w;
        self.base_height = h;
        let bounds = rotated_bounds(w, h, self.rotation);
        self.container_width = bounds.width;
        self.container_height = bounds.height;
    }
}
