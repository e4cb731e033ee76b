//! Per-drawable dynamic data buffers.
//!
//! One [`DynamicDrawableSnapshot`] per drawable, allocated at revival and mutated
//! in place every frame. Payload fields are only meaningful while their change
//! flag is set.

use serde::{Deserialize, Serialize};

use crate::native::dynamic_flags;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicDrawableSnapshot {
    pub visible: bool,
    pub visibility_changed: bool,
    pub opacity_changed: bool,
    pub draw_order_changed: bool,
    pub render_order_changed: bool,
    pub vertex_positions_changed: bool,
    pub blend_color_changed: bool,

    pub opacity: f32,
    pub draw_order: i32,
    pub render_order: i32,
    pub vertex_positions: Vec<[f32; 2]>,
    pub multiply_color: [f32; 4],
    pub screen_color: [f32; 4],
}

impl DynamicDrawableSnapshot {
    pub fn with_vertex_count(vertex_count: usize) -> Self {
        Self {
            opacity: 1.0,
            vertex_positions: vec![[0.0, 0.0]; vertex_count],
            multiply_color: [1.0, 1.0, 1.0, 1.0],
            screen_color: [0.0, 0.0, 0.0, 1.0],
            ..Default::default()
        }
    }

    /// Decode a native dynamic flag byte into the boolean predicates.
    pub fn apply_flags(&mut self, flags: u8) {
        self.visible = flags & dynamic_flags::IS_VISIBLE != 0;
        self.visibility_changed = flags & dynamic_flags::VISIBILITY_DID_CHANGE != 0;
        self.opacity_changed = flags & dynamic_flags::OPACITY_DID_CHANGE != 0;
        self.draw_order_changed = flags & dynamic_flags::DRAW_ORDER_DID_CHANGE != 0;
        self.render_order_changed = flags & dynamic_flags::RENDER_ORDER_DID_CHANGE != 0;
        self.vertex_positions_changed = flags & dynamic_flags::VERTEX_POSITIONS_DID_CHANGE != 0;
        self.blend_color_changed = flags & dynamic_flags::BLEND_COLOR_DID_CHANGE != 0;
    }

    #[inline]
    pub fn has_changes(&self) -> bool {
        self.visibility_changed
            || self.opacity_changed
            || self.draw_order_changed
            || self.render_order_changed
            || self.vertex_positions_changed
            || self.blend_color_changed
    }

    /// Changes that travel through the double-buffered mesh.
    #[inline]
    pub fn needs_mesh_swap(&self) -> bool {
        self.visibility_changed
            || self.render_order_changed
            || self.opacity_changed
            || self.vertex_positions_changed
    }

    /// Copy positions in place; the buffer keeps its allocation.
    pub(crate) fn copy_vertex_positions(&mut self, src: &[[f32; 2]]) {
        if self.vertex_positions.len() == src.len() {
            self.vertex_positions.copy_from_slice(src);
        } else {
            log::debug!(
                target: "vizij_rig::snapshot",
                "vertex count changed from {} to {}",
                self.vertex_positions.len(),
                src.len()
            );
            self.vertex_positions.clear();
            self.vertex_positions.extend_from_slice(src);
        }
    }
}

/// Arena of snapshots indexed by drawable index. Never reallocated after creation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawableSnapshots {
    items: Vec<DynamicDrawableSnapshot>,
}

impl DrawableSnapshots {
    pub fn new(vertex_counts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            items: vertex_counts
                .into_iter()
                .map(DynamicDrawableSnapshot::with_vertex_count)
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, drawable: usize) -> Option<&DynamicDrawableSnapshot> {
        self.items.get(drawable)
    }

    pub(crate) fn get_mut(&mut self, drawable: usize) -> Option<&mut DynamicDrawableSnapshot> {
        self.items.get_mut(drawable)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynamicDrawableSnapshot> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[DynamicDrawableSnapshot] {
        &self.items
    }

    pub fn any_changed(&self) -> bool {
        self.items.iter().any(DynamicDrawableSnapshot::has_changes)
    }
}
