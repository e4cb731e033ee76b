//! Bevy adapter for the Vizij rig core: revives spawned models, ticks them once per
//! frame in `PostUpdate` and reports consumed executions as events.

use bevy::prelude::*;
use vizij_rig_core::MaskAtlasConfig;

pub mod components;
pub mod resources;
pub mod systems;

pub use components::{RigModel, RigSource};
pub use resources::RigMaskAtlas;

/// A completed solver execution reached the rig's entities this frame.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct RigDataReady {
    pub entity: Entity,
    pub frame: u64,
}

/// Drawables whose meshes swapped this frame.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct RigMeshesSwapped {
    pub entity: Entity,
    pub drawables: Vec<usize>,
}

/// Client-side parameter write, applied before the next tick.
#[derive(Event, Debug, Clone)]
pub struct SetRigParameter {
    pub entity: Entity,
    pub id: String,
    pub value: f32,
}

/// Resize the shared mask atlas; every rig registers again afterwards.
#[derive(Event, Debug, Clone)]
pub struct ReconfigureMaskAtlas(pub MaskAtlasConfig);

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RigTickSet;

pub struct VizijRigPlugin;

impl Plugin for VizijRigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RigMaskAtlas>()
            .add_event::<RigDataReady>()
            .add_event::<RigMeshesSwapped>()
            .add_event::<SetRigParameter>()
            .add_event::<ReconfigureMaskAtlas>()
            .observe(systems::release_rig_on_remove)
            .add_systems(
                PostUpdate,
                (
                    systems::reconfigure_atlas_system,
                    systems::attach_rigs_system,
                    systems::apply_parameters_system,
                    systems::tick_rigs_system,
                    systems::drain_deferred_rigs_system,
                )
                    .chain()
                    .in_set(RigTickSet),
            );
    }
}
