use bevy::prelude::*;
use vizij_rig_core::MaskAtlas;

/// The mask atlas shared by every rig in the world.
#[derive(Resource, Debug, Default)]
pub struct RigMaskAtlas(pub MaskAtlas);
