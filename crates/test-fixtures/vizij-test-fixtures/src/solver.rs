//! Pure-Rust stand-in for the native deformation solver.
//!
//! A rig definition lists parameters, parts and drawables plus a handful of
//! "drivers" mapping parameter values onto drawable attributes. The compiled moc
//! bytes are simply the rig definition serialized as JSON.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vizij_rig_core::native::{constant_flags, dynamic_flags};
use vizij_rig_core::{BlendMode, MocLoader, NativeModel, NativeMoc};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParameterDef {
    pub id: String,
    pub min: f32,
    pub max: f32,
    #[serde(default)]
    pub default: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PartDef {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "one")]
    pub opacity: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrawableDef {
    pub id: String,
    #[serde(default)]
    pub part: Option<String>,
    #[serde(default)]
    pub texture: i32,
    #[serde(default)]
    pub blend: BlendMode,
    #[serde(default)]
    pub double_sided: bool,
    #[serde(default)]
    pub inverted_mask: bool,
    /// Ids of the drawables masking this one.
    #[serde(default)]
    pub masks: Vec<String>,
    pub vertices: Vec<[f32; 2]>,
    #[serde(default)]
    pub uvs: Vec<[f32; 2]>,
    #[serde(default)]
    pub indices: Vec<u16>,
    #[serde(default = "one")]
    pub opacity: f32,
    #[serde(default)]
    pub draw_order: i32,
    #[serde(default)]
    pub render_order: i32,
}

/// How a parameter influences the model during an update.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Driver {
    /// Offsets every vertex of `drawable` by `delta * value`.
    Translate {
        parameter: String,
        drawable: String,
        delta: [f32; 2],
    },
    /// Multiplies the drawable opacity by the value clamped to `[0, 1]`.
    Opacity { parameter: String, drawable: String },
    /// Adds `offset` to the render order while the value exceeds 0.5.
    RenderOrder {
        parameter: String,
        drawable: String,
        offset: i32,
    },
    /// Blends the multiply color from white towards `color` by the value.
    MultiplyColor {
        parameter: String,
        drawable: String,
        color: [f32; 4],
    },
    /// The solver writes `value` into the parameter on every update.
    Pin { parameter: String, value: f32 },
    /// The solver copies `source` into `target` on every update.
    Mirror { source: String, target: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RigDefinition {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub parts: Vec<PartDef>,
    #[serde(default)]
    pub drawables: Vec<DrawableDef>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
}

fn one() -> f32 {
    1.0
}

impl RigDefinition {
    pub fn to_moc_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Revives [`FixtureMoc`]s from JSON rig bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLoader;

impl MocLoader for FixtureLoader {
    fn revive(&self, bytes: &[u8]) -> Option<Arc<dyn NativeMoc>> {
        let rig: RigDefinition = serde_json::from_slice(bytes).ok()?;
        Some(Arc::new(FixtureMoc { rig }))
    }
}

#[derive(Debug, Clone)]
pub struct FixtureMoc {
    pub rig: RigDefinition,
}

impl NativeMoc for FixtureMoc {
    fn instantiate(&self) -> Option<Box<dyn NativeModel>> {
        Some(Box::new(FixtureModel::new(&self.rig)))
    }
}

#[derive(Clone, Debug)]
enum CompiledDriver {
    Translate { parameter: usize, drawable: usize, delta: [f32; 2] },
    Opacity { parameter: usize, drawable: usize },
    RenderOrder { parameter: usize, drawable: usize, offset: i32 },
    MultiplyColor { parameter: usize, drawable: usize, color: [f32; 4] },
    Pin { parameter: usize, value: f32 },
    Mirror { source: usize, target: usize },
}

#[derive(Clone, Debug, PartialEq)]
struct DrawableState {
    visible: bool,
    opacity: f32,
    draw_order: i32,
    render_order: i32,
    positions: Vec<[f32; 2]>,
    multiply: [f32; 4],
    screen: [f32; 4],
}

/// One model instance of a fixture rig.
#[derive(Clone, Debug)]
pub struct FixtureModel {
    parameter_ids: Vec<String>,
    parameter_mins: Vec<f32>,
    parameter_maxs: Vec<f32>,
    parameter_defaults: Vec<f32>,
    parameter_values: Vec<f32>,

    part_ids: Vec<String>,
    part_parents: Vec<i32>,
    part_opacities: Vec<f32>,

    drawable_ids: Vec<String>,
    constant_flags: Vec<u8>,
    textures: Vec<i32>,
    drawable_parents: Vec<i32>,
    masks: Vec<Vec<i32>>,
    uvs: Vec<Vec<[f32; 2]>>,
    indices: Vec<Vec<u16>>,
    base: Vec<DrawableState>,

    dynamic_flags: Vec<u8>,
    opacities: Vec<f32>,
    draw_orders: Vec<i32>,
    render_orders: Vec<i32>,
    positions: Vec<Vec<[f32; 2]>>,
    multiply_colors: Vec<[f32; 4]>,
    screen_colors: Vec<[f32; 4]>,

    drivers: Vec<CompiledDriver>,
    previous: Option<Vec<DrawableState>>,
    updates: usize,
}

fn index_of<'a>(ids: impl IntoIterator<Item = &'a String>, id: &str) -> Option<usize> {
    ids.into_iter().position(|candidate| candidate == id)
}

fn to_i32(index: Option<usize>) -> i32 {
    index.and_then(|i| i32::try_from(i).ok()).unwrap_or(-1)
}

impl FixtureModel {
    pub fn new(rig: &RigDefinition) -> Self {
        let parameter_ids: Vec<String> = rig.parameters.iter().map(|p| p.id.clone()).collect();
        let part_ids: Vec<String> = rig.parts.iter().map(|p| p.id.clone()).collect();
        let drawable_ids: Vec<String> = rig.drawables.iter().map(|d| d.id.clone()).collect();

        let param = |id: &str| index_of(&parameter_ids, id);
        let drawable = |id: &str| index_of(&drawable_ids, id);
        let drivers = rig
            .drivers
            .iter()
            .filter_map(|d| {
                Some(match d {
                    Driver::Translate { parameter, drawable: target, delta } => CompiledDriver::Translate {
                        parameter: param(parameter)?,
                        drawable: drawable(target)?,
                        delta: *delta,
                    },
                    Driver::Opacity { parameter, drawable: target } => CompiledDriver::Opacity {
                        parameter: param(parameter)?,
                        drawable: drawable(target)?,
                    },
                    Driver::RenderOrder { parameter, drawable: target, offset } => CompiledDriver::RenderOrder {
                        parameter: param(parameter)?,
                        drawable: drawable(target)?,
                        offset: *offset,
                    },
                    Driver::MultiplyColor { parameter, drawable: target, color } => {
                        CompiledDriver::MultiplyColor {
                            parameter: param(parameter)?,
                            drawable: drawable(target)?,
                            color: *color,
                        }
                    }
                    Driver::Pin { parameter, value } => CompiledDriver::Pin {
                        parameter: param(parameter)?,
                        value: *value,
                    },
                    Driver::Mirror { source, target } => CompiledDriver::Mirror {
                        source: param(source)?,
                        target: param(target)?,
                    },
                })
            })
            .collect();

        let base: Vec<DrawableState> = rig
            .drawables
            .iter()
            .map(|d| DrawableState {
                visible: d.opacity > 0.0,
                opacity: d.opacity,
                draw_order: d.draw_order,
                render_order: d.render_order,
                positions: d.vertices.clone(),
                multiply: [1.0, 1.0, 1.0, 1.0],
                screen: [0.0, 0.0, 0.0, 1.0],
            })
            .collect();

        let constant_flags = rig
            .drawables
            .iter()
            .map(|d| {
                let mut flags = match d.blend {
                    BlendMode::Normal => 0,
                    BlendMode::Additive => constant_flags::BLEND_ADDITIVE,
                    BlendMode::Multiplicative => constant_flags::BLEND_MULTIPLICATIVE,
                };
                if d.double_sided {
                    flags |= constant_flags::IS_DOUBLE_SIDED;
                }
                if d.inverted_mask {
                    flags |= constant_flags::IS_INVERTED_MASK;
                }
                flags
            })
            .collect();

        Self {
            parameter_mins: rig.parameters.iter().map(|p| p.min).collect(),
            parameter_maxs: rig.parameters.iter().map(|p| p.max).collect(),
            parameter_defaults: rig.parameters.iter().map(|p| p.default).collect(),
            parameter_values: rig.parameters.iter().map(|p| p.default).collect(),
            part_parents: rig
                .parts
                .iter()
                .map(|p| to_i32(p.parent.as_deref().and_then(|id| index_of(&part_ids, id))))
                .collect(),
            part_opacities: rig.parts.iter().map(|p| p.opacity).collect(),
            constant_flags,
            textures: rig.drawables.iter().map(|d| d.texture).collect(),
            drawable_parents: rig
                .drawables
                .iter()
                .map(|d| to_i32(d.part.as_deref().and_then(|id| index_of(&part_ids, id))))
                .collect(),
            masks: rig
                .drawables
                .iter()
                .map(|d| d.masks.iter().map(|m| to_i32(index_of(&drawable_ids, m))).collect())
                .collect(),
            uvs: rig
                .drawables
                .iter()
                .map(|d| {
                    if d.uvs.len() == d.vertices.len() {
                        d.uvs.clone()
                    } else {
                        vec![[0.0, 0.0]; d.vertices.len()]
                    }
                })
                .collect(),
            indices: rig.drawables.iter().map(|d| d.indices.clone()).collect(),
            dynamic_flags: base
                .iter()
                .map(|s| if s.visible { dynamic_flags::IS_VISIBLE } else { 0 })
                .collect(),
            opacities: base.iter().map(|s| s.opacity).collect(),
            draw_orders: base.iter().map(|s| s.draw_order).collect(),
            render_orders: base.iter().map(|s| s.render_order).collect(),
            positions: base.iter().map(|s| s.positions.clone()).collect(),
            multiply_colors: base.iter().map(|s| s.multiply).collect(),
            screen_colors: base.iter().map(|s| s.screen).collect(),
            base,
            drivers,
            previous: None,
            updates: 0,
            parameter_ids,
            part_ids,
            drawable_ids,
        }
    }

    /// Completed solver runs.
    pub fn update_count(&self) -> usize {
        self.updates
    }

    fn clamp_parameter(&self, index: usize, value: f32) -> f32 {
        let min = self.parameter_mins[index];
        let max = self.parameter_maxs[index];
        if min <= max {
            value.clamp(min, max)
        } else {
            value
        }
    }

    /// Product of the part's opacity and all its ancestors'.
    fn part_chain_opacity(&self, part: i32) -> f32 {
        let mut opacity = 1.0;
        let mut current = part;
        let mut guard = self.part_ids.len();
        while let Ok(index) = usize::try_from(current) {
            if guard == 0 {
                break;
            }
            guard -= 1;
            opacity *= self.part_opacities.get(index).copied().unwrap_or(1.0);
            current = self.part_parents.get(index).copied().unwrap_or(-1);
        }
        opacity
    }

    fn solve(&self) -> Vec<DrawableState> {
        let mut states = self.base.clone();
        for (i, state) in states.iter_mut().enumerate() {
            state.opacity *= self.part_chain_opacity(self.drawable_parents[i]);
        }
        for driver in &self.drivers {
            match *driver {
                CompiledDriver::Translate { parameter, drawable, delta } => {
                    let v = self.parameter_values[parameter];
                    for p in &mut states[drawable].positions {
                        p[0] += delta[0] * v;
                        p[1] += delta[1] * v;
                    }
                }
                CompiledDriver::Opacity { parameter, drawable } => {
                    states[drawable].opacity *= self.parameter_values[parameter].clamp(0.0, 1.0);
                }
                CompiledDriver::RenderOrder { parameter, drawable, offset } => {
                    if self.parameter_values[parameter] > 0.5 {
                        states[drawable].render_order += offset;
                    }
                }
                CompiledDriver::MultiplyColor { parameter, drawable, color } => {
                    let w = self.parameter_values[parameter].clamp(0.0, 1.0);
                    let out = &mut states[drawable].multiply;
                    for c in 0..4 {
                        out[c] = 1.0 + (color[c] - 1.0) * w;
                    }
                }
                CompiledDriver::Pin { .. } | CompiledDriver::Mirror { .. } => {}
            }
        }
        for state in &mut states {
            state.visible = state.opacity > 0.0;
        }
        states
    }
}

impl NativeModel for FixtureModel {
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
        self.masks.get(drawable).map(Vec::as_slice).unwrap_or(&[])
    }
    fn drawable_vertex_uvs(&self, drawable: usize) -> &[[f32; 2]] {
        self.uvs.get(drawable).map(Vec::as_slice).unwrap_or(&[])
    }
    fn drawable_indices(&self, drawable: usize) -> &[u16] {
        self.indices.get(drawable).map(Vec::as_slice).unwrap_or(&[])
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
        self.positions.get(drawable).map(Vec::as_slice).unwrap_or(&[])
    }
    fn drawable_multiply_colors(&self) -> &[[f32; 4]] {
        &self.multiply_colors
    }
    fn drawable_screen_colors(&self) -> &[[f32; 4]] {
        &self.screen_colors
    }

    fn update(&mut self) {
        for i in 0..self.drivers.len() {
            match self.drivers[i] {
                CompiledDriver::Pin { parameter, value } => {
                    self.parameter_values[parameter] = self.clamp_parameter(parameter, value);
                }
                CompiledDriver::Mirror { source, target } => {
                    let v = self.parameter_values[source];
                    self.parameter_values[target] = self.clamp_parameter(target, v);
                }
                _ => {}
            }
        }

        let states = self.solve();
        for (i, state) in states.iter().enumerate() {
            let prev = self.previous.as_ref().and_then(|p| p.get(i));
            let changed = |same: bool| prev.is_none() || !same;
            let mut flags = self.dynamic_flags[i] & dynamic_flags::ALL_CHANGES;
            if state.visible {
                flags |= dynamic_flags::IS_VISIBLE;
            }
            if changed(prev.map_or(false, |p| p.visible == state.visible)) {
                flags |= dynamic_flags::VISIBILITY_DID_CHANGE;
            }
            if changed(prev.map_or(false, |p| p.opacity == state.opacity)) {
                flags |= dynamic_flags::OPACITY_DID_CHANGE;
            }
            if changed(prev.map_or(false, |p| p.draw_order == state.draw_order)) {
                flags |= dynamic_flags::DRAW_ORDER_DID_CHANGE;
            }
            if changed(prev.map_or(false, |p| p.render_order == state.render_order)) {
                flags |= dynamic_flags::RENDER_ORDER_DID_CHANGE;
            }
            if changed(prev.map_or(false, |p| p.positions == state.positions)) {
                flags |= dynamic_flags::VERTEX_POSITIONS_DID_CHANGE;
            }
            if changed(prev.map_or(false, |p| p.multiply == state.multiply && p.screen == state.screen)) {
                flags |= dynamic_flags::BLEND_COLOR_DID_CHANGE;
            }
            self.dynamic_flags[i] = flags;
            self.opacities[i] = state.opacity;
            self.draw_orders[i] = state.draw_order;
            self.render_orders[i] = state.render_order;
            self.positions[i].clone_from(&state.positions);
            self.multiply_colors[i] = state.multiply;
            self.screen_colors[i] = state.screen;
        }
        self.previous = Some(states);
        self.updates += 1;
    }

    fn reset_dynamic_flags(&mut self) {
        for flags in &mut self.dynamic_flags {
            *flags &= !dynamic_flags::ALL_CHANGES;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> RigDefinition {
        serde_json::from_value(serde_json::json!({
            "name": "unit",
            "parameters": [
                { "id": "X", "min": -1.0, "max": 1.0 },
                { "id": "Y", "min": 0.0, "max": 1.0 }
            ],
            "parts": [
                { "id": "Root" },
                { "id": "Child", "parent": "Root", "opacity": 0.5 }
            ],
            "drawables": [
                { "id": "Quad", "part": "Child", "vertices": [[0.0, 0.0], [1.0, 0.0]] }
            ],
            "drivers": [
                { "kind": "translate", "parameter": "X", "drawable": "Quad", "delta": [2.0, 0.0] },
                { "kind": "mirror", "source": "X", "target": "Y" },
                { "kind": "pin", "parameter": "X", "value": 3.0 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn first_update_reports_everything() {
        let mut model = FixtureModel::new(&rig());
        model.update();
        assert_eq!(model.drawable_dynamic_flags()[0], dynamic_flags::IS_VISIBLE | dynamic_flags::ALL_CHANGES);
        // parent chain: 1.0 * 0.5
        assert_eq!(model.drawable_opacities()[0], 0.5);
        assert_eq!(model.drawable_parent_part_indices(), &[1]);
        assert_eq!(model.part_parent_indices(), &[-1, 0]);
    }

    #[test]
    fn drivers_apply_in_order_and_clamp() {
        let mut model = FixtureModel::new(&rig());
        model.update();
        // mirror ran before pin: Y copied X's old value 0
        assert_eq!(model.parameter_values(), &[1.0, 0.0]);
        assert_eq!(model.drawable_vertex_positions(0), &[[2.0, 0.0], [3.0, 0.0]]);

        model.reset_dynamic_flags();
        model.update();
        assert_eq!(model.parameter_values(), &[1.0, 1.0]);
        // geometry unchanged since the previous run
        assert_eq!(model.drawable_dynamic_flags()[0], dynamic_flags::IS_VISIBLE);
    }

    #[test]
    fn loader_rejects_garbage() {
        assert!(FixtureLoader.revive(b"not json").is_none());
        let moc = FixtureLoader.revive(&rig().to_moc_bytes()).unwrap();
        assert_eq!(moc.instantiate().unwrap().drawable_count(), 1);
    }
}
