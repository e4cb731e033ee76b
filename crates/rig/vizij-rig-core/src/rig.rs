//! One model end to end: orchestrator, render state and mask groups.

use serde::{Deserialize, Serialize};

use crate::config::RigConfig;
use crate::error::RigResult;
use crate::ids::FrameKey;
use crate::mask::{MaskAtlas, MaskController};
use crate::moc::MocAsset;
use crate::orchestrator::{ModelOrchestrator, TickOutcome};
use crate::render::RenderController;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub outcome: TickOutcome,
    /// Drawables whose meshes swapped this tick.
    pub swapped: Vec<usize>,
}

#[derive(Debug)]
pub struct Rig {
    orchestrator: ModelOrchestrator,
    render: RenderController,
    masks: MaskController,
    last_tick: Option<(FrameKey, TickReport)>,
}

impl Rig {
    /// Revive the model now and register its mask groups with `atlas`.
    pub fn new(moc: MocAsset, config: RigConfig, atlas: &mut MaskAtlas) -> RigResult<Self> {
        let mut orchestrator = ModelOrchestrator::new(moc, config);
        orchestrator.revive()?;
        let render = RenderController::new(orchestrator.config().renderer.clone(), orchestrator.drawables());
        let masks = MaskController::new(orchestrator.drawables(), atlas);
        Ok(Self {
            orchestrator,
            render,
            masks,
            last_tick: None,
        })
    }

    pub fn orchestrator(&self) -> &ModelOrchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut ModelOrchestrator {
        &mut self.orchestrator
    }

    pub fn render(&self) -> &RenderController {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut RenderController {
        &mut self.render
    }

    pub fn masks(&self) -> &MaskController {
        &self.masks
    }

    /// Engine tick. Render state changes only when a completed execution is consumed.
    /// A repeated frame key returns that frame's report without touching render state.
    pub fn tick(&mut self, frame: FrameKey, atlas: &MaskAtlas) -> TickReport {
        if let Some(report) = self.repeated(frame) {
            return report;
        }
        let Self {
            orchestrator,
            render,
            ..
        } = self;
        render.begin_tick();
        let outcome = orchestrator.on_tick_with(frame, |snapshots| {
            render.apply(snapshots);
        });
        self.finish_tick(frame, outcome, atlas)
    }

    /// Tick for an external update driver. Shares the per-frame dedupe with
    /// [`tick`](Self::tick), so a later `tick` on the same frame reports this one.
    pub fn force_update(&mut self, frame: FrameKey, atlas: &MaskAtlas) -> TickReport {
        if let Some(report) = self.repeated(frame) {
            return report;
        }
        let Self {
            orchestrator,
            render,
            ..
        } = self;
        render.begin_tick();
        let outcome = orchestrator.force_update_with(frame, |snapshots| {
            render.apply(snapshots);
        });
        self.finish_tick(frame, outcome, atlas)
    }

    fn repeated(&self, frame: FrameKey) -> Option<TickReport> {
        match &self.last_tick {
            Some((last, report)) if *last == frame => {
                log::debug!(target: "vizij_rig::rig", "frame {:?} already ticked", frame);
                Some(report.clone())
            }
            _ => None,
        }
    }

    fn finish_tick(&mut self, frame: FrameKey, outcome: TickOutcome, atlas: &MaskAtlas) -> TickReport {
        // masks move continuously; junctions run every tick
        self.masks.update(&mut self.render, atlas);
        let report = TickReport {
            outcome,
            swapped: self.render.swapped_this_tick().to_vec(),
        };
        self.last_tick = Some((frame, report.clone()));
        report
    }

    /// Register the mask groups again, e.g. after the atlas was reconfigured.
    pub fn reattach_masks(&mut self, atlas: &mut MaskAtlas) -> bool {
        self.masks.attach(atlas)
    }

    /// Release the native model and the atlas tiles.
    pub fn release(&mut self, atlas: &mut MaskAtlas) {
        self.orchestrator.release();
        self.masks.detach(atlas);
    }
}
