//! Double-buffered mesh state of one drawable.
//!
//! New dirty data is written into the back buffer and becomes visible to the
//! renderer only through a swap, so the front buffer always holds one complete
//! execution. Visibility and render order travel with the swap and are applied at
//! the start of the following tick.

use serde::{Deserialize, Serialize};

use crate::config::{RendererConfig, SortingMode};
use crate::mask::MaskBinding;
use crate::snapshot::DynamicDrawableSnapshot;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffer {
    pub positions: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
}

impl MeshBuffer {
    pub fn with_vertex_count(vertex_count: usize) -> Self {
        Self {
            positions: vec![[0.0, 0.0]; vertex_count],
            colors: vec![[1.0, 1.0, 1.0, 1.0]; vertex_count],
        }
    }

    fn write_positions(&mut self, src: &[[f32; 2]]) {
        if self.positions.len() == src.len() {
            self.positions.copy_from_slice(src);
        } else {
            self.positions.clear();
            self.positions.extend_from_slice(src);
        }
    }

    fn fill_colors(&mut self, color: [f32; 4]) {
        self.colors.resize(self.positions.len(), color);
        self.colors.fill(color);
    }
}

/// What one swap carried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwapInfo {
    pub new_vertex_positions: bool,
    pub new_vertex_colors: bool,
    pub did_become_visible: bool,
    pub did_become_invisible: bool,
    pub new_render_order: bool,
}

impl SwapInfo {
    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == SwapInfo::default()
    }
}

#[derive(Clone, Debug)]
pub struct RenderSync {
    drawable: usize,
    buffers: [MeshBuffer; 2],
    front: usize,
    this_swap: SwapInfo,
    last_swap: SwapInfo,

    visible: bool,
    render_order: i32,
    sorting_order: i32,
    opacity: f32,
    tint: [f32; 4],
    multiply_color: [f32; 4],
    screen_color: [f32; 4],
    // values carried by the last swap, applied on the next begin_tick
    swapped_render_order: i32,

    masked_by: Option<MaskBinding>,
    mask_draws: Vec<MaskBinding>,

    swap_count: u64,
    geometry_writes: u64,
}

impl RenderSync {
    pub fn new(drawable: usize, vertex_count: usize) -> Self {
        Self {
            drawable,
            buffers: [
                MeshBuffer::with_vertex_count(vertex_count),
                MeshBuffer::with_vertex_count(vertex_count),
            ],
            front: 0,
            this_swap: SwapInfo::default(),
            last_swap: SwapInfo::default(),
            visible: false,
            render_order: 0,
            sorting_order: 0,
            opacity: 1.0,
            tint: [1.0, 1.0, 1.0, 1.0],
            multiply_color: [1.0, 1.0, 1.0, 1.0],
            screen_color: [0.0, 0.0, 0.0, 1.0],
            swapped_render_order: 0,
            masked_by: None,
            mask_draws: Vec::new(),
            swap_count: 0,
            geometry_writes: 0,
        }
    }

    /// Apply visibility and render order carried by the previous swap.
    pub fn begin_tick(&mut self, config: &RendererConfig) {
        let last = std::mem::take(&mut self.last_swap);
        if last.did_become_visible {
            self.visible = true;
        }
        if last.did_become_invisible {
            self.visible = false;
        }
        if last.new_render_order {
            self.render_order = self.swapped_render_order;
            self.sorting_order = match config.sorting {
                SortingMode::BackToFront => config.sorting_order_base + self.render_order,
                SortingMode::FrontToBack => config.sorting_order_base - self.render_order,
            };
        }
        self.mask_draws.clear();
    }

    /// Consume one snapshot. Returns true when the meshes were swapped.
    pub fn process(&mut self, snapshot: &DynamicDrawableSnapshot) -> bool {
        if snapshot.blend_color_changed {
            self.multiply_color = snapshot.multiply_color;
            self.screen_color = snapshot.screen_color;
        }
        if !snapshot.needs_mesh_swap() {
            return false;
        }

        if snapshot.visibility_changed {
            self.this_swap.did_become_visible = snapshot.visible;
            self.this_swap.did_become_invisible = !snapshot.visible;
        }
        if snapshot.render_order_changed {
            self.this_swap.new_render_order = true;
            self.swapped_render_order = snapshot.render_order;
        }
        if snapshot.opacity_changed {
            self.opacity = snapshot.opacity;
            self.this_swap.new_vertex_colors = true;
        }
        if snapshot.vertex_positions_changed {
            let back = 1 - self.front;
            self.buffers[back].write_positions(&snapshot.vertex_positions);
            self.this_swap.new_vertex_positions = true;
            self.geometry_writes += 1;
        }

        self.swap_meshes();
        true
    }

    /// Toggle front and back, republish vertex colors into the new front and
    /// bring the new back up to date with fresh positions.
    pub fn swap_meshes(&mut self) {
        self.front = 1 - self.front;
        let color = self.vertex_color();
        let carry_positions = self.this_swap.new_vertex_positions;
        let (front, back) = self.split_buffers();
        front.fill_colors(color);
        if carry_positions {
            back.write_positions(&front.positions);
        }
        self.last_swap = std::mem::take(&mut self.this_swap);
        self.swap_count += 1;
    }

    fn split_buffers(&mut self) -> (&mut MeshBuffer, &mut MeshBuffer) {
        let (a, b) = self.buffers.split_at_mut(1);
        if self.front == 0 {
            (&mut a[0], &mut b[0])
        } else {
            (&mut b[0], &mut a[0])
        }
    }

    /// Tint with opacity folded into alpha.
    pub fn vertex_color(&self) -> [f32; 4] {
        let [r, g, b, a] = self.tint;
        [r, g, b, a * self.opacity]
    }

    /// Tint applied on the next swap.
    pub fn set_color(&mut self, tint: [f32; 4]) {
        self.tint = tint;
        self.this_swap.new_vertex_colors = true;
    }

    #[inline]
    pub fn drawable(&self) -> usize {
        self.drawable
    }

    #[inline]
    pub fn front_index(&self) -> usize {
        self.front
    }

    pub fn front(&self) -> &MeshBuffer {
        &self.buffers[self.front]
    }

    pub fn back(&self) -> &MeshBuffer {
        &self.buffers[1 - self.front]
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn render_order(&self) -> i32 {
        self.render_order
    }

    pub fn sorting_order(&self) -> i32 {
        self.sorting_order
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn multiply_color(&self) -> [f32; 4] {
        self.multiply_color
    }

    pub fn screen_color(&self) -> [f32; 4] {
        self.screen_color
    }

    pub fn last_swap(&self) -> SwapInfo {
        self.last_swap
    }

    /// Mask this drawable samples from the atlas.
    pub fn masked_by(&self) -> Option<&MaskBinding> {
        self.masked_by.as_ref()
    }

    pub fn set_masked_by(&mut self, binding: Option<MaskBinding>) {
        self.masked_by = binding;
    }

    /// Atlas tiles this drawable is drawn into this tick.
    pub fn mask_draws(&self) -> &[MaskBinding] {
        &self.mask_draws
    }

    pub fn push_mask_draw(&mut self, binding: MaskBinding) {
        self.mask_draws.push(binding);
    }

    /// Number of completed swaps; the renderer's completion signal.
    pub fn swap_count(&self) -> u64 {
        self.swap_count
    }

    /// Number of vertex position writes into the back buffer.
    pub fn geometry_writes(&self) -> u64 {
        self.geometry_writes
    }
}
