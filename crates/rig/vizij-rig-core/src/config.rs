//! Per-model configuration, set once at construction.

use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult};

/// Who drives the per-frame update of a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateDriver {
    /// The orchestrator's own per-tick entry point drives updates.
    #[default]
    Orchestrator,
    /// An external update controller calls `force_update`; per-tick entry is a no-op.
    External,
}

/// Where enqueued model tasks execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Execute immediately on the calling thread.
    #[default]
    Inline,
    /// Hold tasks until the host drains the queue.
    Deferred,
    /// Hand tasks to a background worker thread.
    Worker,
}

/// How render orders map onto renderer sorting orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortingMode {
    #[default]
    BackToFront,
    FrontToBack,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Tint republished into vertex colors on every mesh swap.
    pub color: [f32; 4],
    pub sorting: SortingMode,
    pub sorting_order_base: i32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            sorting: SortingMode::BackToFront,
            sorting_order_base: 0,
        }
    }
}

/// Shared mask atlas sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskAtlasConfig {
    /// Atlas texture edge in pixels.
    pub size: u32,
    pub subdivisions: u32,
    pub channels: u32,
}

impl MaskAtlasConfig {
    pub const MAX_SUBDIVISIONS: u32 = 5;
    pub const MAX_CHANNELS: u32 = 4;

    pub fn validate(&self) -> RigResult<()> {
        if self.subdivisions == 0 || self.subdivisions > Self::MAX_SUBDIVISIONS {
            return Err(RigError::InvalidMaskConfig {
                reason: format!(
                    "subdivisions must be in 1..={}, got {}",
                    Self::MAX_SUBDIVISIONS,
                    self.subdivisions
                ),
            });
        }
        if self.channels == 0 || self.channels > Self::MAX_CHANNELS {
            return Err(RigError::InvalidMaskConfig {
                reason: format!(
                    "channels must be in 1..={}, got {}",
                    Self::MAX_CHANNELS,
                    self.channels
                ),
            });
        }
        if self.size == 0 || !self.size.is_power_of_two() {
            return Err(RigError::InvalidMaskConfig {
                reason: format!("size must be a non-zero power of two, got {}", self.size),
            });
        }
        Ok(())
    }
}

impl Default for MaskAtlasConfig {
    fn default() -> Self {
        Self {
            size: 1024,
            subdivisions: 3,
            channels: 4,
        }
    }
}

/// Configuration for one model instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub driver: UpdateDriver,
    pub dispatch: DispatchMode,
    pub renderer: RendererConfig,
}
