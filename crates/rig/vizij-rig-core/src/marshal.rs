//! Bulk copies between entity mirrors and the native flat arrays.

use crate::entities::{ParameterEntity, PartEntity};
use crate::handle::NativeHandle;
use crate::snapshot::DrawableSnapshots;

/// Push/pull/decode routines. Stateless; every call is a single O(n) pass.
pub struct ArrayMarshaler;

impl ArrayMarshaler {
    /// Write every parameter value and part opacity into the native arrays at the
    /// entity's cached index. Runs before every native update.
    pub fn push(parameters: &mut [ParameterEntity], parts: &[PartEntity], handle: &mut NativeHandle) {
        let model = handle.model_mut();

        let values = model.parameter_values_mut();
        for p in parameters.iter_mut() {
            if let Some(slot) = values.get_mut(p.native_index) {
                *slot = p.value();
            }
            p.mark_pushed();
        }

        let opacities = model.part_opacities_mut();
        for part in parts {
            if let Some(slot) = opacities.get_mut(part.native_index) {
                *slot = part.opacity();
            }
        }
    }

    /// Read parameter values back after a native update. No-op (returns false) when
    /// the handle has never been updated. Entities edited since the last push keep
    /// their client value.
    pub fn pull(parameters: &mut [ParameterEntity], handle: &NativeHandle) -> bool {
        if !handle.has_updated() {
            log::debug!(target: "vizij_rig::marshal", "pull skipped: model never executed");
            return false;
        }
        let values = handle.model().parameter_values();
        for p in parameters.iter_mut() {
            if p.is_edited() {
                continue;
            }
            if let Some(v) = values.get(p.native_index) {
                p.apply_native(*v);
            }
        }
        true
    }

    /// Decode the native dirty bitfield into the snapshots, copy changed payloads,
    /// then clear the native dirty flags. Returns the number of drawables with changes.
    pub fn decode_dynamic_data(snapshots: &mut DrawableSnapshots, handle: &mut NativeHandle) -> usize {
        let mut changed = 0;
        {
            let model = handle.model();
            let flags = model.drawable_dynamic_flags();
            let opacities = model.drawable_opacities();
            let draw_orders = model.drawable_draw_orders();
            let render_orders = model.drawable_render_orders();
            let multiply = model.drawable_multiply_colors();
            let screen = model.drawable_screen_colors();

            for (i, flag) in flags.iter().enumerate() {
                let Some(snapshot) = snapshots.get_mut(i) else {
                    break;
                };
                snapshot.apply_flags(*flag);
                if !snapshot.has_changes() {
                    continue;
                }
                changed += 1;

                if snapshot.opacity_changed {
                    snapshot.opacity = opacities.get(i).copied().unwrap_or(snapshot.opacity);
                }
                if snapshot.draw_order_changed {
                    snapshot.draw_order = draw_orders.get(i).copied().unwrap_or(snapshot.draw_order);
                }
                if snapshot.render_order_changed {
                    snapshot.render_order = render_orders.get(i).copied().unwrap_or(snapshot.render_order);
                }
                if snapshot.vertex_positions_changed {
                    snapshot.copy_vertex_positions(model.drawable_vertex_positions(i));
                }
                if snapshot.blend_color_changed {
                    if let Some(c) = multiply.get(i) {
                        snapshot.multiply_color = *c;
                    }
                    if let Some(c) = screen.get(i) {
                        snapshot.screen_color = *c;
                    }
                }
            }
        }
        handle.model_mut().reset_dynamic_flags();
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityMirrors;
    use crate::native::dynamic_flags;
    use crate::test_support::{mock_asset, MockModel};

    fn handle_with(model: MockModel) -> NativeHandle {
        NativeHandle::create(&mock_asset(model)).expect("handle")
    }

    #[test]
    fn pull_before_any_update_is_noop() {
        let mut handle = handle_with(MockModel::new(&["A"], &[]));
        handle.model_mut().parameter_values_mut()[0] = 0.9;
        let mut mirrors = EntityMirrors::revive(&handle);
        mirrors.parameters[0].apply_native(0.1);

        assert!(!ArrayMarshaler::pull(&mut mirrors.parameters, &handle));
        assert_eq!(mirrors.parameters[0].value(), 0.1);
    }

    #[test]
    fn pull_keeps_client_edits() {
        let mut model = MockModel::new(&["A", "B"], &[]);
        model.pinned = vec![(0, 0.5), (1, 0.5)];
        let mut handle = handle_with(model);
        let mut mirrors = EntityMirrors::revive(&handle);

        ArrayMarshaler::push(&mut mirrors.parameters, &mirrors.parts, &mut handle);
        handle.update();
        mirrors.parameters[1].set_value(-0.25);
        assert!(ArrayMarshaler::pull(&mut mirrors.parameters, &handle));

        assert_eq!(mirrors.parameters[0].value(), 0.5);
        assert_eq!(mirrors.parameters[1].value(), -0.25);
    }

    #[test]
    fn push_writes_parts_at_native_index() {
        let mut handle = handle_with(MockModel::new(&[], &[]));
        let mut mirrors = EntityMirrors::revive(&handle);
        mirrors.parts[0].set_opacity(0.3);
        ArrayMarshaler::push(&mut mirrors.parameters, &mirrors.parts, &mut handle);
        assert_eq!(handle.model().part_opacities()[0], 0.3);
    }

    #[test]
    fn decode_consumes_dirty_state_once() {
        let mut model = MockModel::new(&[], &["D0", "D1"]);
        model.drift = Some([0.5, 0.0]);
        let mut handle = handle_with(model);
        let mut snapshots = DrawableSnapshots::new([4, 4]);

        handle.update();
        assert_eq!(ArrayMarshaler::decode_dynamic_data(&mut snapshots, &mut handle), 2);
        let s0 = snapshots.get(0).unwrap();
        assert!(s0.vertex_positions_changed);
        assert_eq!(s0.vertex_positions[0], [-0.5, -1.0]);

        assert_eq!(ArrayMarshaler::decode_dynamic_data(&mut snapshots, &mut handle), 0);
        assert!(!snapshots.any_changed());
        assert!(snapshots.get(1).unwrap().visible);
        assert_eq!(
            handle.model().drawable_dynamic_flags()[0],
            dynamic_flags::IS_VISIBLE
        );
    }
}
