use bevy::core::FrameCount;
use bevy::prelude::*;
use vizij_rig_core::{DispatchMode, FrameKey, Rig, TickOutcome};

use crate::components::{RigModel, RigSource};
use crate::resources::RigMaskAtlas;
use crate::{ReconfigureMaskAtlas, RigDataReady, RigMeshesSwapped, SetRigParameter};

/// Revive every newly spawned [`RigSource`] and swap it for a [`RigModel`].
pub fn attach_rigs_system(
    mut commands: Commands,
    sources: Query<(Entity, &RigSource), Without<RigModel>>,
    mut atlas: ResMut<RigMaskAtlas>,
) {
    for (entity, source) in sources.iter() {
        let mut entity_commands = commands.entity(entity);
        entity_commands.remove::<RigSource>();
        match Rig::new(source.moc.clone(), source.config.clone(), &mut atlas.0) {
            Ok(rig) => {
                bevy::log::debug!("revived rig {} on {entity:?}", source.moc.name());
                entity_commands.insert(RigModel(rig));
            }
            Err(err) => {
                bevy::log::error!("rig {} on {entity:?} failed to revive: {err}", source.moc.name());
            }
        }
    }
}

pub fn apply_parameters_system(mut events: EventReader<SetRigParameter>, mut rigs: Query<&mut RigModel>) {
    for ev in events.read() {
        let Ok(mut model) = rigs.get_mut(ev.entity) else {
            bevy::log::warn!("parameter {} targets {:?}, which has no rig", ev.id, ev.entity);
            continue;
        };
        if let Err(err) = model.0.orchestrator_mut().set_parameter(&ev.id, ev.value) {
            bevy::log::warn!("{err}");
        }
    }
}

pub fn reconfigure_atlas_system(
    mut events: EventReader<ReconfigureMaskAtlas>,
    mut atlas: ResMut<RigMaskAtlas>,
    mut rigs: Query<&mut RigModel>,
) {
    let Some(ReconfigureMaskAtlas(config)) = events.read().last().cloned() else {
        return;
    };
    match atlas.0.reconfigure(config) {
        Ok(dropped) if !dropped.is_empty() => {
            bevy::log::warn!("mask atlas reconfigure dropped {} sources", dropped.len());
        }
        Ok(_) => {}
        Err(err) => {
            bevy::log::error!("mask atlas reconfigure rejected: {err}");
            return;
        }
    }
    for mut model in rigs.iter_mut() {
        model.0.reattach_masks(&mut atlas.0);
    }
}

/// One engine tick per rig. A rig with an external driver that was force-updated
/// earlier in the frame reports that update here; otherwise it only refreshes masks.
pub fn tick_rigs_system(
    frames: Option<Res<FrameCount>>,
    mut fallback: Local<u64>,
    atlas: Res<RigMaskAtlas>,
    mut rigs: Query<(Entity, &mut RigModel)>,
    mut ready: EventWriter<RigDataReady>,
    mut swapped: EventWriter<RigMeshesSwapped>,
) {
    let frame = match frames {
        Some(count) => u64::from(count.0),
        None => {
            *fallback += 1;
            *fallback
        }
    };
    for (entity, mut model) in rigs.iter_mut() {
        let report = model.0.tick(FrameKey(frame), &atlas.0);
        if report.outcome == TickOutcome::Updated {
            ready.send(RigDataReady { entity, frame });
        }
        if !report.swapped.is_empty() {
            swapped.send(RigMeshesSwapped {
                entity,
                drawables: report.swapped,
            });
        }
    }
}

/// Run the work deferred rigs enqueued this frame so the next tick can consume it.
/// Worker rigs complete on their own thread.
pub fn drain_deferred_rigs_system(rigs: Query<&RigModel>) {
    for model in rigs.iter() {
        let orchestrator = model.0.orchestrator();
        if orchestrator.config().dispatch == DispatchMode::Deferred {
            orchestrator.flush();
        }
    }
}

/// Return the native model and atlas tiles when a rig leaves the world.
pub fn release_rig_on_remove(
    trigger: Trigger<OnRemove, RigModel>,
    mut rigs: Query<&mut RigModel>,
    mut atlas: ResMut<RigMaskAtlas>,
) {
    if let Ok(mut model) = rigs.get_mut(trigger.entity()) {
        model.0.release(&mut atlas.0);
    }
}
