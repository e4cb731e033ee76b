use crate::config::RendererConfig;
use crate::entities::DrawableEntity;
use crate::error::{RigError, RigResult};
use crate::snapshot::DrawableSnapshots;

use super::sync::RenderSync;

/// One [`RenderSync`] per drawable, indexed by drawable index.
#[derive(Clone, Debug)]
pub struct RenderController {
    config: RendererConfig,
    syncs: Vec<RenderSync>,
    swapped: Vec<usize>,
}

impl RenderController {
    pub fn new(config: RendererConfig, drawables: &[DrawableEntity]) -> Self {
        let syncs = drawables
            .iter()
            .map(|d| {
                let mut sync = RenderSync::new(d.native_index, d.constants.vertex_count);
                sync.set_color(config.color);
                sync
            })
            .collect();
        Self {
            config,
            syncs,
            swapped: Vec::new(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Apply what the previous swaps carried; clears per-tick state.
    pub fn begin_tick(&mut self) {
        self.swapped.clear();
        for sync in &mut self.syncs {
            sync.begin_tick(&self.config);
        }
    }

    /// Process one consumed execution. Returns the number of drawables swapped.
    pub fn apply(&mut self, snapshots: &DrawableSnapshots) -> usize {
        if snapshots.len() != self.syncs.len() {
            log::warn!(
                target: "vizij_rig::render",
                "snapshot count {} does not match drawable count {}",
                snapshots.len(),
                self.syncs.len()
            );
        }
        let mut swaps = 0;
        for (index, (sync, snapshot)) in self.syncs.iter_mut().zip(snapshots.iter()).enumerate() {
            if sync.process(snapshot) {
                self.swapped.push(index);
                swaps += 1;
            }
        }
        swaps
    }

    pub fn swapped_this_tick(&self) -> &[usize] {
        &self.swapped
    }

    /// Tint for every drawable, republished on each drawable's next swap.
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.config.color = color;
        for sync in &mut self.syncs {
            sync.set_color(color);
        }
    }

    pub fn len(&self) -> usize {
        self.syncs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syncs.is_empty()
    }

    pub fn get(&self, drawable: usize) -> Option<&RenderSync> {
        self.syncs.get(drawable)
    }

    pub fn get_mut(&mut self, drawable: usize) -> Option<&mut RenderSync> {
        self.syncs.get_mut(drawable)
    }

    pub fn drawable(&self, drawable: usize) -> RigResult<&RenderSync> {
        self.syncs
            .get(drawable)
            .ok_or(RigError::UnknownDrawable { index: drawable })
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderSync> {
        self.syncs.iter()
    }

    /// Visible drawables in ascending sorting order; ties keep drawable order.
    pub fn draw_list(&self) -> Vec<usize> {
        let mut list: Vec<usize> = (0..self.syncs.len())
            .filter(|&i| self.syncs[i].is_visible())
            .collect();
        list.sort_by_key(|&i| self.syncs[i].sorting_order());
        list
    }
}
