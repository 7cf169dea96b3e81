use crate::types::{Result, StampError};
use image::{ImageFormat, ImageReader, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// Handle to an asset owned by a [`super::PlacementModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// A raster seal or signature image.
///
/// Only the header is read when the asset is created; the pixels are decoded
/// when a PDF is generated.
#[derive(Clone)]
pub struct Asset {
    id: AssetId,
    bytes: Arc<[u8]>,
    format: ImageFormat,
    width_px: u32,
    height_px: u32,
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Asset {
    pub(crate) fn from_bytes(id: AssetId, bytes: Vec<u8>) -> Result<Self> {
        let decode_err = |source| StampError::AssetDecode {
            asset: id.0,
            source,
        };

        let format = image::guess_format(&bytes).map_err(decode_err)?;
        let (width_px, height_px) = ImageReader::with_format(Cursor::new(&bytes[..]), format)
            .into_dimensions()
            .map_err(decode_err)?;

        if width_px == 0 || height_px == 0 {
            return Err(StampError::Config(format!("{id} has zero dimensions")));
        }

        Ok(Self {
            id,
            bytes: bytes.into(),
            format,
            width_px,
            height_px,
        })
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Natural (width, height) in pixels
    pub fn dimensions_px(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width_px) / f64::from(self.height_px)
    }

    /// Decode the full image to RGBA
    pub fn decode(&self) -> Result<RgbaImage> {
        image::load_from_memory_with_format(&self.bytes, self.format)
            .map(|img| img.to_rgba8())
            .map_err(|source| StampError::AssetDecode {
                asset: self.id.0,
                source,
            })
    }
}

/// (width, height) in millimeters of an asset whose longest edge is `size_mm`
pub fn base_dimensions(size_mm: f64, aspect_ratio: f64) -> (f64, f64) {
    if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
        return (size_mm, size_mm);
    }
    if aspect_ratio >= 1.0 {
        (size_mm, size_mm / aspect_ratio)
    } else {
        (size_mm * aspect_ratio, size_mm)
    }
}
