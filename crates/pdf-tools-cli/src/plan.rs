//! JSON placement plans for the `sign` subcommand
//!
//! ```json
//! {
//!   "options": { "raster_dpi": 200 },
//!   "assets": [
//!     {
//!       "image": "signature.png",
//!       "size_mm": 35,
//!       "instances": [
//!         { "page": 1, "x": 120, "y": 250 },
//!         { "page": 3, "x": 20, "y": 250, "rotation": 10 }
//!       ]
//!     },
//!     { "image": "seal.png", "straddle": true, "straddle_y": 140 }
//!   ]
//! }
//! ```
//!
//! Image paths are resolved relative to the plan file.

use anyhow::{Context, Result};
use pdf_stamp::{ConfigSpec, GenerationOptions, PlacementMode, PlacementModel, Point, Target};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct PlacementPlan {
    #[serde(default)]
    pub options: Option<GenerationOptions>,
    pub assets: Vec<PlannedAsset>,
}

#[derive(Debug, Deserialize)]
pub struct PlannedAsset {
    pub image: PathBuf,
    #[serde(default = "default_size")]
    pub size_mm: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub straddle: bool,
    #[serde(default)]
    pub straddle_y: Option<f64>,
    #[serde(default)]
    pub instances: Vec<PlannedInstance>,
}

/// One placement of an asset; unset fields inherit from the asset entry
#[derive(Debug, Deserialize)]
pub struct PlannedInstance {
    pub page: u32,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    pub size_mm: Option<f64>,
}

fn default_size() -> f64 {
    pdf_stamp::units::DEFAULT_SIZE_MM
}

impl PlacementPlan {
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        let plan = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse plan {}", path.display()))?;
        Ok(plan)
    }

    /// Build a sign-mode model, reading images relative to `base_dir`
    pub async fn build_model(&self, base_dir: &Path) -> Result<PlacementModel> {
        let mut model = PlacementModel::new(PlacementMode::Sign);

        for entry in &self.assets {
            let image_path = base_dir.join(&entry.image);
            let bytes = tokio::fs::read(&image_path)
                .await
                .with_context(|| format!("Failed to read image {}", image_path.display()))?;
            let asset = model
                .add_asset(bytes)
                .with_context(|| format!("Unsupported image {}", image_path.display()))?;

            let spec = ConfigSpec {
                size_mm: entry.size_mm,
                rotation: entry.rotation,
                position: Point::new(entry.x, entry.y),
                straddle: entry.straddle,
                straddle_y_mm: entry.straddle_y,
            };
            let config = model
                .create_config(asset, spec)
                .context("Asset vanished while building the plan")?;

            for planned in &entry.instances {
                let Some(instance) = model.add_instance(config, planned.page) else {
                    log::warn!("Skipping instance on invalid page {}", planned.page);
                    continue;
                };
                let target = Target::from(instance);
                if let Some(size) = planned.size_mm {
                    model.update_size(target, size);
                }
                if let Some(rotation) = planned.rotation {
                    model.update_rotation(target, rotation);
                }
                if planned.x.is_some() || planned.y.is_some() {
                    let position = Point::new(
                        planned.x.unwrap_or(entry.x),
                        planned.y.unwrap_or(entry.y),
                    );
                    model.update_position(target, position);
                }
            }
        }

        Ok(model)
    }
}
