//! Managed mirrors of native parameters, parts and drawables.
//!
//! Each mirror caches the native array index it was assigned at revival; the
//! index never changes for the lifetime of the model.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::handle::NativeHandle;
use crate::native::{BlendMode, ConstantFlags};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntity {
    pub id: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub native_index: usize,
    value: f32,
    /// Set by client writes, cleared when the value is pushed to the native model.
    #[serde(skip)]
    edited: bool,
}

impl ParameterEntity {
    pub fn new(id: impl Into<String>, min: f32, max: f32, default: f32, native_index: usize) -> Self {
        Self {
            id: id.into(),
            min,
            max,
            default,
            native_index,
            value: default,
            edited: false,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Client write. Clamped into `[min, max]`.
    pub fn set_value(&mut self, value: f32) {
        self.value = value.clamp(self.min, self.max);
        self.edited = true;
    }

    /// Weighted override towards `value`; `weight` 1 replaces, 0 keeps.
    pub fn blend_value(&mut self, value: f32, weight: f32) {
        let w = weight.clamp(0.0, 1.0);
        self.set_value(self.value + (value - self.value) * w);
    }

    /// Additive write scaled by `weight`.
    pub fn add_value(&mut self, delta: f32, weight: f32) {
        self.set_value(self.value + delta * weight);
    }

    pub fn reset(&mut self) {
        self.set_value(self.default);
    }

    /// Position of the value inside `[min, max]`, 0 when the range is empty.
    pub fn normalized(&self) -> f32 {
        let span = self.max - self.min;
        if span <= f32::EPSILON {
            0.0
        } else {
            (self.value - self.min) / span
        }
    }

    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub(crate) fn mark_pushed(&mut self) {
        self.edited = false;
    }

    /// Overwrite with a value read back from the native model.
    pub(crate) fn apply_native(&mut self, value: f32) {
        self.value = value;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartEntity {
    pub id: String,
    pub parent: Option<usize>,
    pub native_index: usize,
    opacity: f32,
}

impl PartEntity {
    pub fn new(id: impl Into<String>, parent: Option<usize>, opacity: f32, native_index: usize) -> Self {
        Self {
            id: id.into(),
            parent,
            native_index,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

/// Drawable attributes fixed at revival.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawableConstants {
    pub blend_mode: BlendMode,
    pub double_sided: bool,
    pub inverted_mask: bool,
    /// Drawable indices of the masks applied to this drawable.
    pub masks: Vec<usize>,
    pub texture_index: usize,
    pub parent_part: Option<usize>,
    pub vertex_uvs: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
    pub vertex_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawableEntity {
    pub id: String,
    pub native_index: usize,
    pub constants: DrawableConstants,
}

impl DrawableEntity {
    #[inline]
    pub fn uses_mask(&self) -> bool {
        !self.constants.masks.is_empty()
    }
}

fn optional_index(raw: i32) -> Option<usize> {
    usize::try_from(raw).ok()
}

/// All entity mirrors of one model plus id lookups.
#[derive(Clone, Debug, Default)]
pub struct EntityMirrors {
    pub parameters: Vec<ParameterEntity>,
    pub parts: Vec<PartEntity>,
    pub drawables: Vec<DrawableEntity>,
    parameter_lookup: HashMap<String, usize>,
    part_lookup: HashMap<String, usize>,
    drawable_lookup: HashMap<String, usize>,
}

impl EntityMirrors {
    /// Build every mirror from the native handle's static tables and current values.
    pub fn revive(handle: &NativeHandle) -> Self {
        let model = handle.model();

        let ids = model.parameter_ids();
        let mins = model.parameter_minimum_values();
        let maxs = model.parameter_maximum_values();
        let defaults = model.parameter_default_values();
        let values = model.parameter_values();
        let parameters: Vec<ParameterEntity> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let mut p = ParameterEntity::new(
                    id.clone(),
                    mins.get(i).copied().unwrap_or(0.0),
                    maxs.get(i).copied().unwrap_or(0.0),
                    defaults.get(i).copied().unwrap_or(0.0),
                    i,
                );
                if let Some(v) = values.get(i) {
                    p.apply_native(*v);
                }
                p
            })
            .collect();

        let parents = model.part_parent_indices();
        let opacities = model.part_opacities();
        let parts: Vec<PartEntity> = model
            .part_ids()
            .iter()
            .enumerate()
            .map(|(i, id)| {
                PartEntity::new(
                    id.clone(),
                    parents.get(i).copied().and_then(optional_index),
                    opacities.get(i).copied().unwrap_or(1.0),
                    i,
                )
            })
            .collect();

        let flags = model.drawable_constant_flags();
        let textures = model.drawable_texture_indices();
        let drawable_parents = model.drawable_parent_part_indices();
        let drawables: Vec<DrawableEntity> = model
            .drawable_ids()
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let flag = ConstantFlags(flags.get(i).copied().unwrap_or(0));
                let uvs = model.drawable_vertex_uvs(i).to_vec();
                DrawableEntity {
                    id: id.clone(),
                    native_index: i,
                    constants: DrawableConstants {
                        blend_mode: flag.blend_mode(),
                        double_sided: flag.is_double_sided(),
                        inverted_mask: flag.is_inverted_mask(),
                        masks: model
                            .drawable_masks(i)
                            .iter()
                            .copied()
                            .filter_map(optional_index)
                            .collect(),
                        texture_index: textures.get(i).copied().and_then(optional_index).unwrap_or(0),
                        parent_part: drawable_parents.get(i).copied().and_then(optional_index),
                        vertex_count: uvs.len(),
                        vertex_uvs: uvs,
                        indices: model.drawable_indices(i).to_vec(),
                    },
                }
            })
            .collect();

        Self::from_entities(parameters, parts, drawables)
    }

    pub fn from_entities(
        parameters: Vec<ParameterEntity>,
        parts: Vec<PartEntity>,
        drawables: Vec<DrawableEntity>,
    ) -> Self {
        let parameter_lookup = parameters
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let part_lookup = parts.iter().enumerate().map(|(i, p)| (p.id.clone(), i)).collect();
        let drawable_lookup = drawables
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        Self {
            parameters,
            parts,
            drawables,
            parameter_lookup,
            part_lookup,
            drawable_lookup,
        }
    }

    pub fn parameter_index(&self, id: &str) -> Option<usize> {
        self.parameter_lookup.get(id).copied()
    }

    pub fn part_index(&self, id: &str) -> Option<usize> {
        self.part_lookup.get(id).copied()
    }

    pub fn drawable_index(&self, id: &str) -> Option<usize> {
        self.drawable_lookup.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_clamps_and_marks_edited() {
        let mut p = ParameterEntity::new("ParamAngleX", -30.0, 30.0, 0.0, 0);
        assert!(!p.is_edited());
        p.set_value(45.0);
        assert_eq!(p.value(), 30.0);
        assert!(p.is_edited());
        p.mark_pushed();
        assert!(!p.is_edited());
    }

    #[test]
    fn blend_and_add() {
        let mut p = ParameterEntity::new("ParamEyeLOpen", 0.0, 1.0, 1.0, 3);
        p.blend_value(0.0, 0.25);
        assert!((p.value() - 0.75).abs() < 1e-6);
        p.add_value(-0.5, 0.5);
        assert!((p.value() - 0.5).abs() < 1e-6);
        assert!((p.normalized() - 0.5).abs() < 1e-6);
        p.reset();
        assert_eq!(p.value(), 1.0);
    }

    #[test]
    fn part_opacity_is_clamped() {
        let mut part = PartEntity::new("PartArmL", None, 2.0, 0);
        assert_eq!(part.opacity(), 1.0);
        part.set_opacity(-1.0);
        assert_eq!(part.opacity(), 0.0);
    }

    #[test]
    fn lookups_follow_entity_order() {
        let mirrors = EntityMirrors::from_entities(
            vec![
                ParameterEntity::new("A", 0.0, 1.0, 0.0, 0),
                ParameterEntity::new("B", 0.0, 1.0, 0.0, 1),
            ],
            vec![PartEntity::new("P", None, 1.0, 0)],
            Vec::new(),
        );
        assert_eq!(mirrors.parameter_index("B"), Some(1));
        assert_eq!(mirrors.part_index("P"), Some(0));
        assert_eq!(mirrors.parameter_index("Z"), None);
        assert_eq!(mirrors.drawable_index("D"), None);
    }
}
