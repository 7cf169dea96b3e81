//! Placement model shared by the stamp and sign features
//!
//! A [`PlacementModel`] owns the assets, the reusable configs built from them,
//! and (in sign mode) the concrete instances dropped onto pages. The two
//! features differ only in how configs resolve to pages:
//!
//! - **Stamp**: each config is drawn on every page in its `selected_pages`
//! - **Sign**: each config is a template; instances carry the page placements
//!
//! Straddle configs resolve to one slice per page in both modes.
//!
//! Operations on ids that no longer exist are logged and ignored so that late
//! UI events (a drag ending after its target was removed) cannot fail.

mod asset;
mod placement;

pub use asset::{Asset, AssetId, base_dimensions};
pub use placement::{Placement, clamp_size};

use crate::types::{Point, Result};
use crate::units::DEFAULT_SIZE_MM;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which feature the model backs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// One config stamped on many selected pages
    Stamp,
    /// Configs with many independent instances
    Sign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config#{}", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// Something whose placement can be edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Config(ConfigId),
    Instance(InstanceId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Config(id) => id.fmt(f),
            Target::Instance(id) => id.fmt(f),
        }
    }
}

impl From<ConfigId> for Target {
    fn from(id: ConfigId) -> Self {
        Target::Config(id)
    }
}

impl From<InstanceId> for Target {
    fn from(id: InstanceId) -> Self {
        Target::Instance(id)
    }
}

/// Initial values for a new config
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigSpec {
    pub size_mm: f64,
    pub rotation: f64,
    pub position: Point,
    pub straddle: bool,
    /// Vertical position of a straddle stamp; defaults to `position.y`
    pub straddle_y_mm: Option<f64>,
}

impl Default for ConfigSpec {
    fn default() -> Self {
        Self {
            size_mm: DEFAULT_SIZE_MM,
            rotation: 0.0,
            position: Point::default(),
            straddle: false,
            straddle_y_mm: None,
        }
    }
}

impl ConfigSpec {
    pub fn at(position: Point) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// A reusable placement template for one asset
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub id: ConfigId,
    pub asset_id: AssetId,
    /// Size, rotation and default position
    pub placement: Placement,
    /// Pages this config is stamped on (stamp mode), 1-based
    pub selected_pages: BTreeSet<u32>,
    pub straddle: bool,
    pub straddle_y_mm: f64,
}

/// One placement of a config on a specific page, edited independently of it
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: InstanceId,
    pub config_id: ConfigId,
    /// 1-based page number
    pub page_number: u32,
    pub placement: Placement,
}

/// Where a resolved placement goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobKind {
    /// Drawn once on a single page at the placement's position
    Page { page_number: u32 },
    /// Sliced across every page, flush with the right edge
    Straddle { y_mm: f64 },
}

/// A placement resolved for generation
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementJob {
    pub source: Target,
    pub asset_id: AssetId,
    pub placement: Placement,
    pub kind: JobKind,
}

/// The editable state of the stamp or sign feature
#[derive(Debug, Clone)]
pub struct PlacementModel {
    mode: PlacementMode,
    assets: BTreeMap<AssetId, Asset>,
    configs: Vec<Config>,
    instances: Vec<Instance>,
    selected: Option<Target>,
    next_id: u64,
}

impl PlacementModel {
    pub fn new(mode: PlacementMode) -> Self {
        Self {
            mode,
            assets: BTreeMap::new(),
            configs: Vec::new(),
            instances: Vec::new(),
            selected: None,
            next_id: 1,
        }
    }

    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // =========================================================================
    // Assets
    // =========================================================================

    /// Register an image; only its header is read here.
    pub fn add_asset(&mut self, bytes: Vec<u8>) -> Result<AssetId> {
        let id = AssetId(self.next_id());
        let asset = Asset::from_bytes(id, bytes)?;
        log::debug!(
            "Added {} ({:?}, {}x{} px)",
            id,
            asset.format(),
            asset.dimensions_px().0,
            asset.dimensions_px().1
        );
        self.assets.insert(id, asset);
        Ok(id)
    }

    /// Drop an asset. Configs that use it stay in the model and make
    /// generation fail until they are removed too.
    pub fn remove_asset(&mut self, id: AssetId) -> bool {
        if self.assets.remove(&id).is_none() {
            log::warn!("Ignoring removal of unknown {}", id);
            return false;
        }
        true
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    // =========================================================================
    // Configs
    // =========================================================================

    /// Create a config for an existing asset
    pub fn create_config(&mut self, asset_id: AssetId, spec: ConfigSpec) -> Option<ConfigId> {
        let Some(aspect_ratio) = self.assets.get(&asset_id).map(Asset::aspect_ratio) else {
            log::warn!("Cannot create config for unknown {}", asset_id);
            return None;
        };

        let id = ConfigId(self.next_id());
        let placement = Placement::new(spec.size_mm, spec.rotation, spec.position, aspect_ratio);
        let straddle_y_mm = spec
            .straddle_y_mm
            .filter(|y| y.is_finite())
            .unwrap_or_else(|| placement.position().y);

        self.configs.push(Config {
            id,
            asset_id,
            placement,
            selected_pages: BTreeSet::new(),
            straddle: spec.straddle,
            straddle_y_mm,
        });
        log::debug!("Created {} for {}", id, asset_id);
        Some(id)
    }

    /// Remove a config together with its instances
    pub fn remove_config(&mut self, id: ConfigId) -> bool {
        let Some(index) = self.configs.iter().position(|c| c.id == id) else {
            log::warn!("Ignoring removal of unknown {}", id);
            return false;
        };
        self.configs.remove(index);

        let removed: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|i| i.config_id == id)
            .map(|i| i.id)
            .collect();
        self.instances.retain(|i| i.config_id != id);

        let clear_selection = match self.selected {
            Some(Target::Config(selected)) => selected == id,
            Some(Target::Instance(selected)) => removed.contains(&selected),
            None => false,
        };
        if clear_selection {
            self.selected = None;
        }
        true
    }

    pub fn config(&self, id: ConfigId) -> Option<&Config> {
        self.configs.iter().find(|c| c.id == id)
    }

    pub fn configs(&self) -> &[Config] {
        &self.configs
    }

    fn config_mut(&mut self, id: ConfigId) -> Option<&mut Config> {
        let config = self.configs.iter_mut().find(|c| c.id == id);
        if config.is_none() {
            log::warn!("Ignoring update of unknown {}", id);
        }
        config
    }

    /// Replace the pages a stamp config is drawn on
    pub fn set_selected_pages(
        &mut self,
        id: ConfigId,
        pages: impl IntoIterator<Item = u32>,
    ) -> bool {
        let Some(config) = self.config_mut(id) else {
            return false;
        };
        config.selected_pages = pages.into_iter().filter(|&p| p > 0).collect();
        true
    }

    /// Turn straddle mode on or off; `y_mm` keeps the current value when `None`
    pub fn set_straddle(&mut self, id: ConfigId, enabled: bool, y_mm: Option<f64>) -> bool {
        let Some(config) = self.config_mut(id) else {
            return false;
        };
        config.straddle = enabled;
        if let Some(y) = y_mm.filter(|y| y.is_finite()) {
            config.straddle_y_mm = y;
        }
        true
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Snapshot a config onto a page. Later edits to the config do not reach
    /// the instance.
    pub fn add_instance(&mut self, config_id: ConfigId, page_number: u32) -> Option<InstanceId> {
        if self.mode != PlacementMode::Sign {
            log::warn!("Instances are only used in sign mode; ignoring {}", config_id);
            return None;
        }
        let Some(placement) = self.config(config_id).map(|c| c.placement) else {
            log::warn!("Cannot add instance of unknown {}", config_id);
            return None;
        };
        if page_number == 0 {
            log::warn!("Page numbers start at 1; ignoring instance of {}", config_id);
            return None;
        }

        let id = InstanceId(self.next_id());
        self.instances.push(Instance {
            id,
            config_id,
            page_number,
            placement,
        });
        Some(id)
    }

    pub fn remove_instance(&mut self, id: InstanceId) -> bool {
        let before = self.instances.len();
        self.instances.retain(|i| i.id != id);
        if self.instances.len() == before {
            log::warn!("Ignoring removal of unknown {}", id);
            return false;
        }
        if self.selected == Some(Target::Instance(id)) {
            self.selected = None;
        }
        true
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    // =========================================================================
    // Placement edits
    // =========================================================================

    /// Current placement of a config or instance
    pub fn placement(&self, target: Target) -> Option<&Placement> {
        match target {
            Target::Config(id) => self.config(id).map(|c| &c.placement),
            Target::Instance(id) => self.instance(id).map(|i| &i.placement),
        }
    }

    fn placement_mut(&mut self, target: Target) -> Option<&mut Placement> {
        let placement = match target {
            Target::Config(id) => self
                .configs
                .iter_mut()
                .find(|c| c.id == id)
                .map(|c| &mut c.placement),
            Target::Instance(id) => self
                .instances
                .iter_mut()
                .find(|i| i.id == id)
                .map(|i| &mut i.placement),
        };
        if placement.is_none() {
            log::warn!("Ignoring update of unknown {}", target);
        }
        placement
    }

    /// Rotate about the visual center
    pub fn update_rotation(&mut self, target: Target, degrees: f64) -> bool {
        let Some(placement) = self.placement_mut(target) else {
            return false;
        };
        placement.set_rotation(degrees);
        true
    }

    /// Move the container's top-left corner
    pub fn update_position(&mut self, target: Target, position: Point) -> bool {
        let Some(placement) = self.placement_mut(target) else {
            return false;
        };
        if !placement.set_position(position) {
            log::warn!("Rejecting non-finite position for {}", target);
            return false;
        }
        true
    }

    /// Resize (longest edge, clamped) keeping the rotation
    pub fn update_size(&mut self, target: Target, size_mm: f64) -> bool {
        let Some(placement) = self.placement_mut(target) else {
            return false;
        };
        placement.set_size(size_mm);
        true
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn select(&mut self, target: Option<Target>) {
        if let Some(t) = target {
            if self.placement(t).is_none() {
                log::warn!("Cannot select unknown {}", t);
                return;
            }
        }
        self.selected = target;
    }

    pub fn selected(&self) -> Option<Target> {
        self.selected
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Asset behind a config or instance
    pub fn asset_for(&self, target: Target) -> Option<AssetId> {
        match target {
            Target::Config(id) => self.config(id).map(|c| c.asset_id),
            Target::Instance(id) => self
                .instance(id)
                .and_then(|i| self.config(i.config_id))
                .map(|c| c.asset_id),
        }
    }

    /// Everything that has to be drawn, in draw order
    pub fn resolve_jobs(&self) -> Vec<PlacementJob> {
        let mut jobs = Vec::new();

        for config in &self.configs {
            if config.straddle {
                jobs.push(PlacementJob {
                    source: Target::Config(config.id),
                    asset_id: config.asset_id,
                    placement: config.placement,
                    kind: JobKind::Straddle {
                        y_mm: config.straddle_y_mm,
                    },
                });
            } else if self.mode == PlacementMode::Stamp {
                jobs.extend(config.selected_pages.iter().map(|&page_number| PlacementJob {
                    source: Target::Config(config.id),
                    asset_id: config.asset_id,
                    placement: config.placement,
                    kind: JobKind::Page { page_number },
                }));
            }
        }

        if self.mode == PlacementMode::Sign {
            for instance in &self.instances {
                let Some(config) = self.config(instance.config_id) else {
                    continue;
                };
                jobs.push(PlacementJob {
                    source: Target::Instance(instance.id),
                    asset_id: config.asset_id,
                    placement: instance.placement,
                    kind: JobKind::Page {
                        page_number: instance.page_number,
                    },
                });
            }
        }

        jobs
    }
}
