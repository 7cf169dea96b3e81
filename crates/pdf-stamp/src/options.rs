use crate::geometry::OrientationNormalizer;
use crate::types::*;
use crate::units::{ANNOTATION_OPACITY, DEFAULT_RASTER_DPI, REFERENCE_WIDTH_MM};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest raster resolution accepted for embedded annotations
pub const MAX_RASTER_DPI: f64 = 1200.0;

/// Settings for producing the final PDF
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GenerationOptions {
    /// Alpha applied to every embedded annotation
    pub opacity: f32,

    /// Resolution the assets are rasterized at
    pub raster_dpi: f64,

    /// Short page edge (in millimeters) that stored positions are authored against
    pub reference_width_mm: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            opacity: ANNOTATION_OPACITY,
            raster_dpi: DEFAULT_RASTER_DPI,
            reference_width_mm: REFERENCE_WIDTH_MM,
        }
    }
}

impl GenerationOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: Self = serde_json::from_slice(&bytes)
            .map_err(|e| StampError::Config(format!("Failed to parse options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StampError::Config(format!("Failed to serialize options: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Orientation normalizer for a document, shared by preview and generation
    pub fn normalizer(&self, pages: Vec<PageGeometry>) -> OrientationNormalizer {
        OrientationNormalizer::new(pages, self.reference_width_mm)
    }

    /// Validate options
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(StampError::Config(format!(
                "Opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }

        if !(self.raster_dpi.is_finite() && self.raster_dpi > 0.0) {
            return Err(StampError::Config(format!(
                "Raster DPI must be positive, got {}",
                self.raster_dpi
            )));
        }
        if self.raster_dpi > MAX_RASTER_DPI {
            return Err(StampError::Config(format!(
                "Raster DPI {} exceeds the maximum of {}",
                self.raster_dpi, MAX_RASTER_DPI
            )));
        }

        if !(self.reference_width_mm.is_finite() && self.reference_width_mm > 0.0) {
            return Err(StampError::Config(format!(
                "Reference width must be positive, got {}",
                self.reference_width_mm
            )));
        }

        Ok(())
    }
}
