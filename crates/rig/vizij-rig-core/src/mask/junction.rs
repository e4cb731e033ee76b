use serde::{Deserialize, Serialize};

use crate::render::RenderController;

use super::tile::{MaskTile, MaskTransform};

/// What a drawable's render path needs to draw into or sample from the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskBinding {
    pub tile: MaskTile,
    pub transform: MaskTransform,
    pub inverted: bool,
}

/// A group of mask drawables and the drawables they mask.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskJunction {
    pub masks: Vec<usize>,
    pub maskeds: Vec<usize>,
    pub inverted: bool,
    pub tile: Option<MaskTile>,
    pub transform: MaskTransform,
}

impl MaskJunction {
    pub fn new(masks: Vec<usize>, inverted: bool) -> Self {
        Self {
            masks,
            maskeds: Vec::new(),
            inverted,
            tile: None,
            transform: MaskTransform::default(),
        }
    }

    pub fn binding(&self) -> Option<MaskBinding> {
        self.tile.map(|tile| MaskBinding {
            tile,
            transform: self.transform,
            inverted: self.inverted,
        })
    }

    /// Recompute the transform from the masks' front geometry and hand the binding
    /// to every mask and masked drawable. Without a tile the maskeds render unmasked.
    pub fn update(&mut self, render: &mut RenderController) {
        let points = self
            .masks
            .iter()
            .filter_map(|&m| render.get(m))
            .flat_map(|sync| sync.front().positions.iter());
        if let Some(transform) = MaskTransform::covering(points) {
            self.transform = transform;
        }

        let binding = self.binding();
        for &masked in &self.maskeds {
            if let Some(sync) = render.get_mut(masked) {
                sync.set_masked_by(binding);
            }
        }
        let Some(binding) = binding else {
            return;
        };
        for &mask in &self.masks {
            if let Some(sync) = render.get_mut(mask) {
                sync.push_mask_draw(binding);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::entities::{DrawableConstants, DrawableEntity};
    use crate::native::dynamic_flags;
    use crate::snapshot::DrawableSnapshots;

    fn controller() -> RenderController {
        let drawables: Vec<DrawableEntity> = (0..3)
            .map(|i| DrawableEntity {
                id: format!("D{i}"),
                native_index: i,
                constants: DrawableConstants {
                    vertex_count: 2,
                    ..Default::default()
                },
            })
            .collect();
        let mut rc = RenderController::new(RendererConfig::default(), &drawables);
        let mut snaps = DrawableSnapshots::new([2, 2, 2]);
        let s = snaps.get_mut(0).unwrap();
        s.apply_flags(dynamic_flags::VERTEX_POSITIONS_DID_CHANGE);
        s.vertex_positions = vec![[0.0, 0.0], [2.0, 1.0]];
        rc.apply(&snaps);
        rc
    }

    #[test]
    fn binds_masks_and_maskeds() {
        let mut rc = controller();
        let mut junction = MaskJunction::new(vec![0], false);
        junction.maskeds = vec![1, 2];
        junction.tile = Some(MaskTile {
            channel: 0,
            column: 0,
            row: 0,
            size: 1.0,
        });
        junction.update(&mut rc);

        assert_eq!(junction.transform.offset, [1.0, 0.5]);
        assert_eq!(junction.transform.scale, 4.0);
        assert_eq!(rc.get(0).unwrap().mask_draws().len(), 1);
        assert_eq!(rc.get(1).unwrap().masked_by(), junction.binding().as_ref());
        assert_eq!(rc.get(2).unwrap().masked_by().unwrap().tile.size, 1.0);
    }

    #[test]
    fn without_tile_maskeds_render_unmasked() {
        let mut rc = controller();
        let mut junction = MaskJunction::new(vec![0], false);
        junction.maskeds = vec![1];
        junction.update(&mut rc);
        assert!(rc.get(1).unwrap().masked_by().is_none());
        assert!(rc.get(0).unwrap().mask_draws().is_empty());
    }
}
