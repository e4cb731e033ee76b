use vizij_rig_core::{FrameKey, MaskAtlas, MaskAtlasConfig, Rig, RigConfig, TickOutcome};
use vizij_test_fixtures::{configs, rigs};

fn tiny_atlas() -> MaskAtlasConfig {
    MaskAtlasConfig {
        size: 256,
        subdivisions: 1,
        channels: 1,
    }
}

fn index(rig: &Rig, id: &str) -> usize {
    rig.orchestrator().drawables().iter().position(|d| d.id == id).unwrap()
}

fn ticked_rig(atlas: &mut MaskAtlas, frames: u64) -> anyhow::Result<Rig> {
    let mut rig = Rig::new(rigs::moc("masked-face")?, RigConfig::default(), atlas)?;
    for frame in 1..=frames {
        rig.tick(FrameKey(frame), atlas);
    }
    Ok(rig)
}

#[test]
fn masked_drawables_bind_to_their_group_tile() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let rig = ticked_rig(&mut atlas, 2)?;
    // FaceMask and the inverted Shadow group
    assert_eq!(rig.masks().junctions().len(), 2);
    assert_eq!(atlas.pool().free_count(), atlas.pool().capacity() - 2);

    let left = rig.render().get(index(&rig, "EyeL")).unwrap().masked_by().copied().unwrap();
    let right = rig.render().get(index(&rig, "EyeR")).unwrap().masked_by().copied().unwrap();
    assert_eq!(left, right);
    assert!(!left.inverted);
    assert_eq!(left.tile.size, 0.25);
    // FaceMask spans (-2, -1)..(2, 3)
    assert_eq!(left.transform.offset, [0.0, 1.0]);
    assert_eq!(left.transform.scale, 8.0);

    let shadow = rig.render().get(index(&rig, "Shadow")).unwrap().masked_by().copied().unwrap();
    assert!(shadow.inverted);
    assert_ne!(shadow.tile, left.tile);

    let mask = rig.render().get(index(&rig, "FaceMask")).unwrap();
    assert!(mask.masked_by().is_none());
    assert_eq!(mask.mask_draws().len(), 2);
    assert!(rig.render().get(index(&rig, "Brow")).unwrap().masked_by().is_none());
    Ok(())
}

#[test]
fn mask_transform_follows_mask_geometry() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let mut rig = ticked_rig(&mut atlas, 3)?;
    let eye = index(&rig, "EyeL");

    rig.orchestrator_mut().set_parameter("ParamAngleX", 10.0)?;
    rig.tick(FrameKey(4), &atlas);
    let binding = rig.render().get(eye).unwrap().masked_by().copied().unwrap();
    assert_eq!(binding.transform.offset, [0.0, 1.0]);

    rig.tick(FrameKey(5), &atlas);
    let binding = rig.render().get(eye).unwrap().masked_by().copied().unwrap();
    assert_eq!(binding.transform.offset, [1.0, 1.0]);
    assert_eq!(binding.transform.scale, 8.0);
    Ok(())
}

#[test]
fn mask_draws_are_rebuilt_every_tick() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let mut rig = ticked_rig(&mut atlas, 2)?;
    let mask = index(&rig, "FaceMask");
    for frame in 3..6 {
        rig.tick(FrameKey(frame), &atlas);
        assert_eq!(rig.render().get(mask).unwrap().mask_draws().len(), 2);
    }
    Ok(())
}

#[test]
fn exhausted_atlas_renders_unmasked() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::new(tiny_atlas())?;
    let rig = ticked_rig(&mut atlas, 2)?;
    assert!(!rig.masks().is_attached());
    assert_eq!(atlas.source_count(), 0);
    assert_eq!(atlas.pool().free_count(), 1);
    for id in ["EyeL", "EyeR", "Shadow"] {
        assert!(rig.render().get(index(&rig, id)).unwrap().masked_by().is_none(), "{id}");
    }
    assert!(rig.render().get(index(&rig, "FaceMask")).unwrap().mask_draws().is_empty());
    Ok(())
}

#[test]
fn reconfigured_atlas_drops_and_reattaches_sources() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let mut rig = ticked_rig(&mut atlas, 2)?;
    let eye = index(&rig, "EyeL");
    let source = rig.masks().source().unwrap();

    let dropped = atlas.reconfigure(tiny_atlas())?;
    assert_eq!(dropped, vec![source]);
    rig.tick(FrameKey(3), &atlas);
    assert!(rig.render().get(eye).unwrap().masked_by().is_none());
    assert!(!rig.masks().is_attached());

    assert!(atlas.reconfigure(MaskAtlasConfig::default())?.is_empty());
    assert!(rig.reattach_masks(&mut atlas));
    rig.tick(FrameKey(4), &atlas);
    assert!(rig.render().get(eye).unwrap().masked_by().is_some());
    Ok(())
}

#[test]
fn release_returns_tiles_and_native_model() -> anyhow::Result<()> {
    let moc = rigs::moc("masked-face")?;
    let mut atlas = MaskAtlas::default();
    let mut rig = Rig::new(moc.clone(), RigConfig::default(), &mut atlas)?;
    assert_eq!(rig.tick(FrameKey(1), &atlas).outcome, TickOutcome::Bootstrapped);
    assert_eq!(moc.ref_count(), 1);

    rig.release(&mut atlas);
    assert_eq!(moc.ref_count(), 0);
    assert_eq!(atlas.source_count(), 0);
    assert_eq!(atlas.pool().free_count(), atlas.pool().capacity());
    assert!(!rig.masks().is_attached());
    Ok(())
}

#[test]
fn two_rigs_share_one_atlas() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let a = ticked_rig(&mut atlas, 2)?;
    let b = ticked_rig(&mut atlas, 2)?;
    assert_eq!(atlas.source_count(), 2);
    assert_eq!(atlas.pool().free_count(), atlas.pool().capacity() - 4);

    let eye = index(&a, "EyeL");
    let tile_a = a.render().get(eye).unwrap().masked_by().unwrap().tile;
    let tile_b = b.render().get(eye).unwrap().masked_by().unwrap().tile;
    assert_ne!(tile_a, tile_b);
    Ok(())
}

fn visible_count(rig: &Rig) -> usize {
    rig.render().iter().filter(|s| s.is_visible()).count()
}

#[test]
fn repeated_frame_key_is_idempotent() -> anyhow::Result<()> {
    let mut atlas = MaskAtlas::default();
    let mut rig = Rig::new(rigs::moc("masked-face")?, RigConfig::default(), &mut atlas)?;
    rig.tick(FrameKey(1), &atlas);

    let first = rig.tick(FrameKey(2), &atlas);
    assert_eq!(first.outcome, TickOutcome::Updated);
    assert_eq!(first.swapped, vec![0, 1, 2, 3, 4, 5]);

    let again = rig.tick(FrameKey(2), &atlas);
    assert_eq!(again, first);
    // visibility from the swap still waits for the next frame
    assert_eq!(visible_count(&rig), 0);
    assert!(rig.render().iter().all(|s| s.swap_count() == 1));

    rig.tick(FrameKey(3), &atlas);
    assert_eq!(visible_count(&rig), 6);
    Ok(())
}

#[test]
fn external_driver_tick_reports_the_forced_update() -> anyhow::Result<()> {
    let config: RigConfig = configs::load("external-driver")?;
    let mut atlas = MaskAtlas::default();
    let mut rig = Rig::new(rigs::moc("masked-face")?, config, &mut atlas)?;

    assert_eq!(rig.force_update(FrameKey(1), &atlas).outcome, TickOutcome::Bootstrapped);
    let forced = rig.force_update(FrameKey(2), &atlas);
    assert_eq!(forced.swapped, vec![0, 1, 2, 3, 4, 5]);

    // the engine tick of the same frame sees the forced update, not a fresh begin
    let ticked = rig.tick(FrameKey(2), &atlas);
    assert_eq!(ticked, forced);
    assert_eq!(visible_count(&rig), 0);

    let next = rig.tick(FrameKey(3), &atlas);
    assert_eq!(next.outcome, TickOutcome::Skipped);
    assert!(next.swapped.is_empty());
    assert_eq!(visible_count(&rig), 6);
    Ok(())
}
