//! Native solver boundary.
//!
//! The deformation solver is an external library reached through a flat-array ABI.
//! These traits are the contract the core calls; adapters wrap the real FFI and
//! tests use a pure-Rust fixture solver. One slot per parameter/part/drawable,
//! indices are stable for the lifetime of a model.

use std::sync::Arc;

/// Constant (per-revival) drawable flag bits.
pub mod constant_flags {
    pub const BLEND_ADDITIVE: u8 = 1 << 0;
    pub const BLEND_MULTIPLICATIVE: u8 = 1 << 1;
    pub const IS_DOUBLE_SIDED: u8 = 1 << 2;
    pub const IS_INVERTED_MASK: u8 = 1 << 3;
}

/// Dynamic (per-update) drawable flag bits.
pub mod dynamic_flags {
    pub const IS_VISIBLE: u8 = 1 << 0;
    pub const VISIBILITY_DID_CHANGE: u8 = 1 << 1;
    pub const OPACITY_DID_CHANGE: u8 = 1 << 2;
    pub const DRAW_ORDER_DID_CHANGE: u8 = 1 << 3;
    pub const RENDER_ORDER_DID_CHANGE: u8 = 1 << 4;
    pub const VERTEX_POSITIONS_DID_CHANGE: u8 = 1 << 5;
    pub const BLEND_COLOR_DID_CHANGE: u8 = 1 << 6;

    /// Every "did change" bit; `IS_VISIBLE` is state and is not part of it.
    pub const ALL_CHANGES: u8 = VISIBILITY_DID_CHANGE
        | OPACITY_DID_CHANGE
        | DRAW_ORDER_DID_CHANGE
        | RENDER_ORDER_DID_CHANGE
        | VERTEX_POSITIONS_DID_CHANGE
        | BLEND_COLOR_DID_CHANGE;
}

/// One instantiated model inside the native solver.
pub trait NativeModel: Send {
    fn parameter_ids(&self) -> &[String];
    fn parameter_minimum_values(&self) -> &[f32];
    fn parameter_maximum_values(&self) -> &[f32];
    fn parameter_default_values(&self) -> &[f32];
    fn parameter_values(&self) -> &[f32];
    fn parameter_values_mut(&mut self) -> &mut [f32];

    fn part_ids(&self) -> &[String];
    /// Parent part index per part, `-1` for roots.
    fn part_parent_indices(&self) -> &[i32];
    fn part_opacities(&self) -> &[f32];
    fn part_opacities_mut(&mut self) -> &mut [f32];

    fn drawable_ids(&self) -> &[String];
    fn drawable_constant_flags(&self) -> &[u8];
    fn drawable_texture_indices(&self) -> &[i32];
    /// Owning part index per drawable, `-1` when detached.
    fn drawable_parent_part_indices(&self) -> &[i32];
    fn drawable_masks(&self, drawable: usize) -> &[i32];
    fn drawable_vertex_uvs(&self, drawable: usize) -> &[[f32; 2]];
    fn drawable_indices(&self, drawable: usize) -> &[u16];

    fn drawable_dynamic_flags(&self) -> &[u8];
    fn drawable_opacities(&self) -> &[f32];
    fn drawable_draw_orders(&self) -> &[i32];
    fn drawable_render_orders(&self) -> &[i32];
    fn drawable_vertex_positions(&self, drawable: usize) -> &[[f32; 2]];
    fn drawable_multiply_colors(&self) -> &[[f32; 4]];
    fn drawable_screen_colors(&self) -> &[[f32; 4]];

    /// Run the deformation solver once over the current parameter/part values.
    fn update(&mut self);
    /// Clear every `*_DID_CHANGE` bit of every drawable.
    fn reset_dynamic_flags(&mut self);

    #[inline]
    fn parameter_count(&self) -> usize {
        self.parameter_ids().len()
    }

    #[inline]
    fn part_count(&self) -> usize {
        self.part_ids().len()
    }

    #[inline]
    fn drawable_count(&self) -> usize {
        self.drawable_ids().len()
    }
}

/// A compiled asset revived inside the solver; creates model instances.
pub trait NativeMoc: Send + Sync {
    fn instantiate(&self) -> Option<Box<dyn NativeModel>>;
}

/// Revives a [`NativeMoc`] from compiled asset bytes.
pub trait MocLoader: Send + Sync {
    fn revive(&self, bytes: &[u8]) -> Option<Arc<dyn NativeMoc>>;
}

/// Blend mode decoded from constant flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiplicative,
}

/// Typed view over a drawable's constant flag byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConstantFlags(pub u8);

impl ConstantFlags {
    #[inline]
    pub fn blend_mode(self) -> BlendMode {
        if self.0 & constant_flags::BLEND_ADDITIVE != 0 {
            BlendMode::Additive
        } else if self.0 & constant_flags::BLEND_MULTIPLICATIVE != 0 {
            BlendMode::Multiplicative
        } else {
            BlendMode::Normal
        }
    }

    #[inline]
    pub fn is_double_sided(self) -> bool {
        self.0 & constant_flags::IS_DOUBLE_SIDED != 0
    }

    #[inline]
    pub fn is_inverted_mask(self) -> bool {
        self.0 & constant_flags::IS_INVERTED_MASK != 0
    }
}
