use vizij_rig_core::native::dynamic_flags;
use vizij_rig_core::{
    DynamicDrawableSnapshot, FrameKey, MaskAtlas, RendererConfig, Rig, RigConfig, RenderSync, TickOutcome,
};
use vizij_test_fixtures::rigs;

fn settled_rig(atlas: &mut MaskAtlas) -> anyhow::Result<Rig> {
    let mut rig = Rig::new(rigs::moc("masked-face")?, RigConfig::default(), atlas)?;
    assert_eq!(rig.tick(FrameKey(1), atlas).outcome, TickOutcome::Bootstrapped);
    // consumes the bootstrap execution: everything changed
    let report = rig.tick(FrameKey(2), atlas);
    assert_eq!(report.outcome, TickOutcome::Updated);
    assert_eq!(report.swapped, vec![0, 1, 2, 3, 4, 5]);
    // applies the visibility and render orders carried by that swap
    assert!(rig.tick(FrameKey(3), atlas).swapped.is_empty());
    Ok(rig)
}

fn index(rig: &Rig, id: &str) -> usize {
    rig.orchestrator().drawables().iter().position(|d| d.id == id).unwrap()
}

#[test]
fn clean_frames_never_swap() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let mut rig = settled_rig(&mut atlas)?;
    for frame in 4..9 {
        let report = rig.tick(FrameKey(frame), &atlas);
        assert_eq!(report.outcome, TickOutcome::Updated);
        assert!(report.swapped.is_empty());
    }
    assert!(rig.render().iter().all(|s| s.swap_count() == 1));
    Ok(())
}

#[test]
fn visibility_only_frame_skips_geometry() {
    let config = RendererConfig::default();
    let mut sync = RenderSync::new(0, 4);
    let mut snapshot = DynamicDrawableSnapshot::with_vertex_count(4);
    snapshot.apply_flags(dynamic_flags::IS_VISIBLE | dynamic_flags::VISIBILITY_DID_CHANGE);

    sync.begin_tick(&config);
    assert!(sync.process(&snapshot));
    assert_eq!(sync.swap_count(), 1);
    assert_eq!(sync.geometry_writes(), 0);
    assert!(sync.last_swap().did_become_visible);
    assert!(!sync.last_swap().new_vertex_positions);

    sync.begin_tick(&config);
    assert!(sync.is_visible());
}

#[test]
fn hidden_drawables_disappear_one_tick_after_swap() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let mut rig = settled_rig(&mut atlas)?;
    let eye = index(&rig, "EyeL");
    assert!(rig.render().get(eye).unwrap().is_visible());

    rig.orchestrator_mut().set_parameter("ParamEyeOpen", 0.0)?;
    // pushes the edit; the execution it triggers is consumed next tick
    assert!(rig.tick(FrameKey(4), &atlas).swapped.is_empty());

    let report = rig.tick(FrameKey(5), &atlas);
    assert!(report.swapped.contains(&eye));
    let sync = rig.render().get(eye).unwrap();
    assert_eq!(sync.opacity(), 0.0);
    assert!(sync.is_visible());

    rig.tick(FrameKey(6), &atlas);
    assert!(!rig.render().get(eye).unwrap().is_visible());
    assert!(!rig.render().draw_list().contains(&eye));
    Ok(())
}

#[test]
fn blend_color_change_bypasses_swap() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let mut rig = settled_rig(&mut atlas)?;
    let brow = index(&rig, "Brow");

    rig.orchestrator_mut().set_parameter("ParamBrowTint", 1.0)?;
    rig.tick(FrameKey(4), &atlas);
    let report = rig.tick(FrameKey(5), &atlas);
    assert!(report.swapped.is_empty());
    let sync = rig.render().get(brow).unwrap();
    assert_eq!(sync.multiply_color(), [0.5, 0.25, 0.25, 1.0]);
    assert_eq!(sync.swap_count(), 1);
    Ok(())
}

#[test]
fn geometry_reaches_front_buffer_atomically() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let mut rig = settled_rig(&mut atlas)?;
    let eye = index(&rig, "EyeR");
    let before = rig.render().get(eye).unwrap().front().positions.clone();
    assert_eq!(before[0], [0.5, 1.0]);

    rig.orchestrator_mut().set_parameter("ParamAngleX", 10.0)?;
    rig.tick(FrameKey(4), &atlas);
    assert_eq!(rig.render().get(eye).unwrap().front().positions, before);

    rig.tick(FrameKey(5), &atlas);
    let sync = rig.render().get(eye).unwrap();
    assert_eq!(sync.front().positions[0], [1.5, 1.0]);
    assert_eq!(sync.back().positions, sync.front().positions);
    assert_eq!(sync.geometry_writes(), 2);
    Ok(())
}

#[test]
fn sorting_orders_follow_render_orders() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let rig = settled_rig(&mut atlas)?;
    let body = index(&rig, "Body");
    // base render order 5, shifted by -10 while ParamBodyFade > 0.5
    assert_eq!(rig.render().get(body).unwrap().sorting_order(), -5);
    assert_eq!(rig.render().draw_list(), vec![body, 0, 1, 2, 3, 4]);
    Ok(())
}
