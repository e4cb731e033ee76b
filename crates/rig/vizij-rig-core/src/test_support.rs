//! In-crate mock solver for unit tests.

use std::sync::Arc;

use crate::moc::MocAsset;
use crate::native::{dynamic_flags, MocLoader, NativeModel, NativeMoc};

#[derive(Clone, Debug, Default)]
pub(crate) struct MockModel {
    pub parameter_ids: Vec<String>,
    pub parameter_mins: Vec<f32>,
    pub parameter_maxs: Vec<f32>,
    pub parameter_defaults: Vec<f32>,
    pub parameter_values: Vec<f32>,
    pub part_ids: Vec<String>,
    pub part_parents: Vec<i32>,
    pub part_opacities: Vec<f32>,
    pub drawable_ids: Vec<String>,
    pub constant_flags: Vec<u8>,
    pub textures: Vec<i32>,
    pub drawable_parents: Vec<i32>,
    pub masks: Vec<Vec<i32>>,
    pub uvs: Vec<Vec<[f32; 2]>>,
    pub indices: Vec<Vec<u16>>,
    pub dynamic_flags: Vec<u8>,
    pub opacities: Vec<f32>,
    pub draw_orders: Vec<i32>,
    pub render_orders: Vec<i32>,
    pub positions: Vec<Vec<[f32; 2]>>,
    pub multiply_colors: Vec<[f32; 4]>,
    pub screen_colors: Vec<[f32; 4]>,
    /// Parameter writes the "solver" performs on every update.
    pub pinned: Vec<(usize, f32)>,
    /// Each update shifts every vertex by this offset and raises the position flag.
    pub drift: Option<[f32; 2]>,
    pub updates: usize,
}

impl MockModel {
    /// `parameters` ids with range [-1, 1], default 0; `drawables` quads at the origin.
    /// Like the real solver, the first update reports every drawable attribute as changed.
    pub fn new(parameters: &[&str], drawables: &[&str]) -> Self {
        let n = parameters.len();
        let d = drawables.len();
        let quad = vec![[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
        Self {
            parameter_ids: parameters.iter().map(|s| s.to_string()).collect(),
            parameter_mins: vec![-1.0; n],
            parameter_maxs: vec![1.0; n],
            parameter_defaults: vec![0.0; n],
            parameter_values: vec![0.0; n],
            part_ids: vec!["Root".to_string()],
            part_parents: vec![-1],
            part_opacities: vec![1.0],
            drawable_ids: drawables.iter().map(|s| s.to_string()).collect(),
            constant_flags: vec![0; d],
            textures: vec![0; d],
            drawable_parents: vec![0; d],
            masks: vec![Vec::new(); d],
            uvs: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]; d],
            indices: vec![vec![0, 1, 2, 0, 2, 3]; d],
            dynamic_flags: vec![dynamic_flags::IS_VISIBLE | dynamic_flags::ALL_CHANGES; d],
            opacities: vec![1.0; d],
            draw_orders: vec![500; d],
            render_orders: (0..d as i32).collect(),
            positions: vec![quad; d],
            multiply_colors: vec![[1.0; 4]; d],
            screen_colors: vec![[0.0, 0.0, 0.0, 1.0]; d],
            ..Default::default()
        }
    }
}

impl NativeModel for MockModel {
    fn parameter_ids(&self) -> &[String] {
        &self.parameter_ids
    }
    fn parameter_minimum_values(&self) -> &[f32] {
        &self.parameter_mins
    }
    fn parameter_maximum_values(&self) -> &[f32] {
        &self.parameter_maxs
    }
    fn parameter_default_values(&self) -> &[f32] {
        &self.parameter_defaults
    }
    fn parameter_values(&self) -> &[f32] {
        &self.parameter_values
    }
    fn parameter_values_mut(&mut self) -> &mut [f32] {
        &mut self.parameter_values
    }
    fn part_ids(&self) -> &[String] {
        &self.part_ids
    }
    fn part_parent_indices(&self) -> &[i32] {
        &self.part_parents
    }
    fn part_opacities(&self) -> &[f32] {
        &self.part_opacities
    }
    fn part_opacities_mut(&mut self) -> &mut [f32] {
        &mut self.part_opacities
    }
    fn drawable_ids(&self) -> &[String] {
        &self.drawable_ids
    }
    fn drawable_constant_flags(&self) -> &[u8] {
        &self.constant_flags
    }
    fn drawable_texture_indices(&self) -> &[i32] {
        &self.textures
    }
    fn drawable_parent_part_indices(&self) -> &[i32] {
        &self.drawable_parents
    }
    fn drawable_masks(&self, drawable: usize) -> &[i32] {
        &self.masks[drawable]
    }
    fn drawable_vertex_uvs(&self, drawable: usize) -> &[[f32; 2]] {
        &self.uvs[drawable]
    }
    fn drawable_indices(&self, drawable: usize) -> &[u16] {
        &self.indices[drawable]
    }
    fn drawable_dynamic_flags(&self) -> &[u8] {
        &self.dynamic_flags
    }
    fn drawable_opacities(&self) -> &[f32] {
        &self.opacities
    }
    fn drawable_draw_orders(&self) -> &[i32] {
        &self.draw_orders
    }
    fn drawable_render_orders(&self) -> &[i32] {
        &self.render_orders
    }
    fn drawable_vertex_positions(&self, drawable: usize) -> &[[f32; 2]] {
        &self.positions[drawable]
    }
    fn drawable_multiply_colors(&self) -> &[[f32; 4]] {
        &self.multiply_colors
    }
    fn drawable_screen_colors(&self) -> &[[f32; 4]] {
        &self.screen_colors
    }

    fn update(&mut self) {
        self.updates += 1;
        for (index, value) in &self.pinned {
            self.parameter_values[*index] = *value;
        }
        if let Some([dx, dy]) = self.drift {
            for (flags, verts) in self.dynamic_flags.iter_mut().zip(self.positions.iter_mut()) {
                for v in verts.iter_mut() {
                    v[0] += dx;
                    v[1] += dy;
                }
                *flags |= dynamic_flags::VERTEX_POSITIONS_DID_CHANGE;
            }
        }
    }

    fn reset_dynamic_flags(&mut self) {
        for f in &mut self.dynamic_flags {
            *f &= !dynamic_flags::ALL_CHANGES;
        }
    }
}

pub(crate) struct MockMoc(pub MockModel);

impl NativeMoc for MockMoc {
    fn instantiate(&self) -> Option<Box<dyn NativeModel>> {
        Some(Box::new(self.0.clone()))
    }
}

pub(crate) struct MockLoader(pub MockModel);

impl MocLoader for MockLoader {
    fn revive(&self, _bytes: &[u8]) -> Option<Arc<dyn NativeMoc>> {
        Some(Arc::new(MockMoc(self.0.clone())))
    }
}

pub(crate) fn mock_asset(model: MockModel) -> MocAsset {
    MocAsset::from_bytes("mock", b"MOC3".to_vec(), Arc::new(MockLoader(model)))
        .expect("mock asset")
}
