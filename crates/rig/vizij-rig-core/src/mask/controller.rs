use crate::entities::DrawableEntity;
use crate::ids::SourceId;
use crate::render::RenderController;

use super::atlas::MaskAtlas;
use super::junction::MaskJunction;

/// Groups a model's masked drawables into junctions and keeps them bound to the
/// tiles its atlas source owns.
#[derive(Debug, Default)]
pub struct MaskController {
    junctions: Vec<MaskJunction>,
    source: Option<SourceId>,
}

impl MaskController {
    /// Group drawables with identical mask sets (first-seen order) and register one
    /// tile per group. On exhaustion every group renders unmasked.
    pub fn new(drawables: &[DrawableEntity], atlas: &mut MaskAtlas) -> Self {
        let mut junctions: Vec<MaskJunction> = Vec::new();
        for drawable in drawables.iter().filter(|d| d.uses_mask()) {
            let mut masks = drawable.constants.masks.clone();
            masks.sort_unstable();
            masks.dedup();
            let inverted = drawable.constants.inverted_mask;
            let slot = junctions
                .iter()
                .position(|j| j.masks == masks && j.inverted == inverted);
            let junction = match slot {
                Some(i) => &mut junctions[i],
                None => {
                    junctions.push(MaskJunction::new(masks, inverted));
                    let last = junctions.len() - 1;
                    &mut junctions[last]
                }
            };
            junction.maskeds.push(drawable.native_index);
        }

        let mut controller = Self {
            junctions,
            source: None,
        };
        controller.attach(atlas);
        controller
    }

    /// Register with `atlas` if not registered yet. Returns whether tiles are held.
    pub fn attach(&mut self, atlas: &mut MaskAtlas) -> bool {
        if self.junctions.is_empty() {
            return false;
        }
        if let Some(source) = self.source {
            if atlas.tiles(source).is_some() {
                return true;
            }
        }
        match atlas.register(self.junctions.len()) {
            Ok((source, tiles)) => {
                for (junction, tile) in self.junctions.iter_mut().zip(tiles) {
                    junction.tile = Some(tile);
                }
                self.source = Some(source);
                true
            }
            Err(err) => {
                log::warn!(
                    target: "vizij_rig::mask",
                    "{err}; {} mask groups render unmasked",
                    self.junctions.len()
                );
                self.source = None;
                false
            }
        }
    }

    /// Refresh tiles from the atlas and run every junction.
    pub fn update(&mut self, render: &mut RenderController, atlas: &MaskAtlas) {
        let tiles = self.source.and_then(|s| atlas.tiles(s));
        if tiles.is_none() && self.source.take().is_some() {
            log::debug!(target: "vizij_rig::mask", "mask source dropped by the atlas");
        }
        for (i, junction) in self.junctions.iter_mut().enumerate() {
            junction.tile = tiles.and_then(|t| t.get(i).copied());
            junction.update(render);
        }
    }

    pub fn detach(&mut self, atlas: &mut MaskAtlas) {
        if let Some(source) = self.source.take() {
            atlas.unregister(source);
        }
        for junction in &mut self.junctions {
            junction.tile = None;
        }
    }

    pub fn junctions(&self) -> &[MaskJunction] {
        &self.junctions
    }

    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }
}
