//! Per-model frame driver.
//!
//! `ModelOrchestrator` owns one model's task, entity mirrors and listener list, and
//! sequences the native update once per engine tick:
//!
//! 1. dedupe by frame key, revive lazily;
//! 2. on the first enabled frame run a synchronous update and return silently;
//! 3. consume a completed execution at most once: pull parameters, notify listeners;
//! 4. push parameters and parts unconditionally, then enqueue and dispatch.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{RigConfig, UpdateDriver};
use crate::dispatch::{dispatcher_for, TaskDispatcher};
use crate::entities::{DrawableEntity, EntityMirrors, ParameterEntity, PartEntity};
use crate::error::{RigError, RigResult};
use crate::handle::NativeHandle;
use crate::ids::{ExecutionId, FrameKey, IdAllocator, ListenerId};
use crate::marshal::ArrayMarshaler;
use crate::moc::MocAsset;
use crate::snapshot::DrawableSnapshots;
use crate::task::{ModelTask, SharedTask};

/// Receives the snapshot arena of every consumed execution.
pub type DrawableDataListener = Box<dyn FnMut(&DrawableSnapshots) + Send + Sync>;

/// What a tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Nothing ran: duplicate frame, external driver, disabled or unusable model.
    Skipped,
    /// Silent first-frame synchronous update.
    Bootstrapped,
    /// Inputs pushed; no completed execution to consume yet.
    Pending,
    /// A completed execution was consumed and announced.
    Updated,
}

struct Revived {
    task: SharedTask,
    mirrors: EntityMirrors,
}

pub struct ModelOrchestrator {
    moc: MocAsset,
    config: RigConfig,
    dispatcher: Arc<dyn TaskDispatcher>,
    revived: Option<Revived>,
    listeners: Vec<(ListenerId, DrawableDataListener)>,
    ids: IdAllocator,
    last_frame: Option<FrameKey>,
    consumed: ExecutionId,
    enabled: bool,
    needs_bootstrap: bool,
    revive_failed: bool,
}

impl fmt::Debug for ModelOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOrchestrator")
            .field("moc", &self.moc.name())
            .field("config", &self.config)
            .field("revived", &self.revived.is_some())
            .field("listeners", &self.listeners.len())
            .field("last_frame", &self.last_frame)
            .field("consumed", &self.consumed)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl ModelOrchestrator {
    pub fn new(moc: MocAsset, config: RigConfig) -> Self {
        let dispatcher = dispatcher_for(config.dispatch);
        Self::with_dispatcher(moc, config, dispatcher)
    }

    /// Use a host-provided dispatcher instead of the one `config.dispatch` selects.
    pub fn with_dispatcher(moc: MocAsset, config: RigConfig, dispatcher: Arc<dyn TaskDispatcher>) -> Self {
        Self {
            moc,
            config,
            dispatcher,
            revived: None,
            listeners: Vec::new(),
            ids: IdAllocator::new(),
            last_frame: None,
            consumed: ExecutionId::default(),
            enabled: true,
            needs_bootstrap: true,
            revive_failed: false,
        }
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn moc(&self) -> &MocAsset {
        &self.moc
    }

    /// Create the native handle, task and entity mirrors. Idempotent.
    pub fn revive(&mut self) -> RigResult<()> {
        if self.revived.is_some() {
            return Ok(());
        }
        let handle = match NativeHandle::create(&self.moc) {
            Ok(handle) => handle,
            Err(err) => {
                if !self.revive_failed {
                    log::warn!(target: "vizij_rig::orchestrator", "revive failed: {err}");
                    self.revive_failed = true;
                }
                return Err(err);
            }
        };
        let mirrors = EntityMirrors::revive(&handle);
        log::debug!(
            target: "vizij_rig::orchestrator",
            "revived '{}': {} parameters, {} parts, {} drawables",
            self.moc.name(),
            mirrors.parameters.len(),
            mirrors.parts.len(),
            mirrors.drawables.len()
        );
        self.revived = Some(Revived {
            task: ModelTask::new(handle).into_shared(),
            mirrors,
        });
        self.revive_failed = false;
        Ok(())
    }

    #[inline]
    pub fn is_revived(&self) -> bool {
        self.revived.is_some()
    }

    pub fn task(&self) -> Option<&SharedTask> {
        self.revived.as_ref().map(|r| &r.task)
    }

    pub fn mirrors(&self) -> Option<&EntityMirrors> {
        self.revived.as_ref().map(|r| &r.mirrors)
    }

    /// Id of the last execution announced to listeners.
    pub fn consumed_execution(&self) -> ExecutionId {
        self.consumed
    }

    /// Re-enable; the next tick is a silent bootstrap again.
    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            self.needs_bootstrap = true;
        }
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn subscribe(&mut self, listener: DrawableDataListener) -> ListenerId {
        let id = self.ids.alloc_listener();
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Engine-driven entry point. Skipped when an external driver owns updates.
    pub fn on_tick(&mut self, frame: FrameKey) -> TickOutcome {
        self.on_tick_with(frame, |_| {})
    }

    /// Like [`on_tick`](Self::on_tick); `sink` sees a consumed execution's snapshots
    /// before the listeners do.
    pub fn on_tick_with(&mut self, frame: FrameKey, sink: impl FnMut(&DrawableSnapshots)) -> TickOutcome {
        if self.config.driver == UpdateDriver::External {
            return TickOutcome::Skipped;
        }
        self.run_tick(frame, sink)
    }

    /// External-driver entry point; runs regardless of the configured driver.
    pub fn force_update(&mut self, frame: FrameKey) -> TickOutcome {
        self.run_tick(frame, |_| {})
    }

    pub fn force_update_with(&mut self, frame: FrameKey, sink: impl FnMut(&DrawableSnapshots)) -> TickOutcome {
        self.run_tick(frame, sink)
    }

    /// Complete work held back by the dispatcher (deferred queue or worker).
    pub fn flush(&self) -> usize {
        self.dispatcher.flush()
    }

    /// Release the native model; deferred while a run is in flight.
    pub fn release(&mut self) -> bool {
        match &self.revived {
            Some(revived) => revived.task.lock().release_unmanaged(),
            None => false,
        }
    }

    fn run_tick(&mut self, frame: FrameKey, mut sink: impl FnMut(&DrawableSnapshots)) -> TickOutcome {
        if !self.enabled {
            return TickOutcome::Skipped;
        }
        if self.last_frame == Some(frame) {
            log::debug!(target: "vizij_rig::orchestrator", "frame {:?} already ticked", frame);
            return TickOutcome::Skipped;
        }
        self.last_frame = Some(frame);
        if self.revive().is_err() {
            return TickOutcome::Skipped;
        }

        let Self {
            revived,
            listeners,
            dispatcher,
            consumed,
            needs_bootstrap,
            ..
        } = self;
        let Some(Revived { task: shared, mirrors }) = revived.as_mut() else {
            return TickOutcome::Skipped;
        };

        let mut task = shared.lock();
        if task.is_released() {
            log::debug!(target: "vizij_rig::orchestrator", "tick on released model");
            return TickOutcome::Skipped;
        }

        if *needs_bootstrap {
            *needs_bootstrap = false;
            if let Some(handle) = task.handle_mut() {
                ArrayMarshaler::push(&mut mirrors.parameters, &mirrors.parts, handle);
            }
            return if task.update_now() {
                TickOutcome::Bootstrapped
            } else {
                TickOutcome::Skipped
            };
        }

        let mut outcome = TickOutcome::Pending;
        if task.did_execute() && task.execution() != *consumed {
            if let Some(handle) = task.handle() {
                ArrayMarshaler::pull(&mut mirrors.parameters, handle);
            }
            *consumed = task.execution();
            sink(task.snapshots());
            for (_, listener) in listeners.iter_mut() {
                listener(task.snapshots());
            }
            outcome = TickOutcome::Updated;
        }

        if let Some(handle) = task.handle_mut() {
            ArrayMarshaler::push(&mut mirrors.parameters, &mirrors.parts, handle);
        }
        let enqueued = task.update();
        drop(task);
        if enqueued {
            dispatcher.dispatch(Arc::clone(shared));
        }
        outcome
    }

    // Entity API. Read accessors are empty until the model is revived; mutating
    // accessors revive lazily.

    pub fn parameters(&self) -> &[ParameterEntity] {
        self.mirrors().map(|m| m.parameters.as_slice()).unwrap_or(&[])
    }

    pub fn parameters_mut(&mut self) -> &mut [ParameterEntity] {
        match self.mirrors_mut() {
            Some(m) => m.parameters.as_mut_slice(),
            None => &mut [],
        }
    }

    pub fn parameter(&self, id: &str) -> Option<&ParameterEntity> {
        let mirrors = self.mirrors()?;
        mirrors.parameters.get(mirrors.parameter_index(id)?)
    }

    pub fn parameter_mut(&mut self, id: &str) -> Option<&mut ParameterEntity> {
        let mirrors = self.mirrors_mut()?;
        let index = mirrors.parameter_index(id)?;
        mirrors.parameters.get_mut(index)
    }

    /// Clamped client write; pushed to the native model on the next tick.
    pub fn set_parameter(&mut self, id: &str, value: f32) -> RigResult<()> {
        let parameter = self
            .parameter_mut(id)
            .ok_or_else(|| RigError::UnknownParameter { id: id.to_string() })?;
        parameter.set_value(value);
        Ok(())
    }

    pub fn parts(&self) -> &[PartEntity] {
        self.mirrors().map(|m| m.parts.as_slice()).unwrap_or(&[])
    }

    pub fn parts_mut(&mut self) -> &mut [PartEntity] {
        match self.mirrors_mut() {
            Some(m) => m.parts.as_mut_slice(),
            None => &mut [],
        }
    }

    pub fn part_mut(&mut self, id: &str) -> Option<&mut PartEntity> {
        let mirrors = self.mirrors_mut()?;
        let index = mirrors.part_index(id)?;
        mirrors.parts.get_mut(index)
    }

    pub fn set_part_opacity(&mut self, id: &str, opacity: f32) -> RigResult<()> {
        let part = self
            .part_mut(id)
            .ok_or_else(|| RigError::UnknownPart { id: id.to_string() })?;
        part.set_opacity(opacity);
        Ok(())
    }

    pub fn drawables(&self) -> &[DrawableEntity] {
        self.mirrors().map(|m| m.drawables.as_slice()).unwrap_or(&[])
    }

    pub fn drawable(&self, id: &str) -> Option<&DrawableEntity> {
        let mirrors = self.mirrors()?;
        mirrors.drawables.get(mirrors.drawable_index(id)?)
    }

    fn mirrors_mut(&mut self) -> Option<&mut EntityMirrors> {
        self.revive().ok()?;
        self.revived.as_mut().map(|r| &mut r.mirrors)
    }
}
