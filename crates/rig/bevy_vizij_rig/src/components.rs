use bevy::prelude::*;
use vizij_rig_core::{MocAsset, Rig, RigConfig};

/// A model waiting to be revived. The attach system replaces it with [`RigModel`].
#[derive(Component, Debug, Clone)]
pub struct RigSource {
    pub moc: MocAsset,
    pub config: RigConfig,
}

impl RigSource {
    pub fn new(moc: MocAsset) -> Self {
        Self {
            moc,
            config: RigConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RigConfig) -> Self {
        self.config = config;
        self
    }
}

/// A live model: orchestrator, render state and mask groups.
#[derive(Component, Debug)]
pub struct RigModel(pub Rig);
