//! Per-model task state machine.
//!
//! `Enqueued` is the mutual-exclusion gate: a second `update()` while a run is
//! pending or in flight is a silent no-op. Once enqueued a task always reaches
//! `Executed`; releasing the native handle never cancels an in-flight run.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::handle::NativeHandle;
use crate::ids::ExecutionId;
use crate::marshal::ArrayMarshaler;
use crate::snapshot::DrawableSnapshots;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Idle,
    Enqueued,
    Executing,
    Executed,
}

impl TaskState {
    #[inline]
    pub fn is_in_flight(self) -> bool {
        matches!(self, TaskState::Enqueued | TaskState::Executing)
    }
}

/// Shared ownership of one task between the orchestrator and a dispatcher.
pub type SharedTask = Arc<Mutex<ModelTask>>;

#[derive(Debug)]
pub struct ModelTask {
    state: TaskState,
    handle: Option<NativeHandle>,
    snapshots: DrawableSnapshots,
    execution: ExecutionId,
    release_pending: bool,
    changed_drawables: usize,
}

impl ModelTask {
    /// Take ownership of `handle`; snapshots are sized from its drawables.
    pub fn new(handle: NativeHandle) -> Self {
        let model = handle.model();
        let snapshots = DrawableSnapshots::new(
            (0..model.drawable_count()).map(|i| model.drawable_vertex_positions(i).len()),
        );
        Self {
            state: TaskState::Idle,
            handle: Some(handle),
            snapshots,
            execution: ExecutionId::default(),
            release_pending: false,
            changed_drawables: 0,
        }
    }

    /// A task without a native handle. Every operation on it is a logged no-op.
    pub fn detached() -> Self {
        Self {
            state: TaskState::Idle,
            handle: None,
            snapshots: DrawableSnapshots::default(),
            execution: ExecutionId::default(),
            release_pending: false,
            changed_drawables: 0,
        }
    }

    pub fn into_shared(self) -> SharedTask {
        Arc::new(Mutex::new(self))
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// True iff the state is `Executed`.
    #[inline]
    pub fn did_execute(&self) -> bool {
        self.state == TaskState::Executed
    }

    /// Id of the most recent completed execution; zero before the first.
    #[inline]
    pub fn execution(&self) -> ExecutionId {
        self.execution
    }

    pub fn snapshots(&self) -> &DrawableSnapshots {
        &self.snapshots
    }

    /// Drawables reporting changes in the last execution.
    pub fn changed_drawables(&self) -> usize {
        self.changed_drawables
    }

    pub fn handle(&self) -> Option<&NativeHandle> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut NativeHandle> {
        self.handle.as_mut()
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    #[inline]
    pub fn is_release_pending(&self) -> bool {
        self.release_pending
    }

    /// Request a run. Returns false (state untouched) when one is already
    /// pending or in flight, or when there is no native handle.
    pub fn update(&mut self) -> bool {
        if self.handle.is_none() {
            log::warn!(target: "vizij_rig::task", "update on a task without native handle");
            return false;
        }
        if self.state.is_in_flight() {
            log::debug!(target: "vizij_rig::task", "update ignored: task {:?}", self.state);
            return false;
        }
        self.state = TaskState::Enqueued;
        true
    }

    /// Run the native update and decode its dirty data. Only valid from `Enqueued`.
    pub fn execute(&mut self) -> bool {
        if self.state != TaskState::Enqueued {
            log::debug!(target: "vizij_rig::task", "execute ignored: task {:?}", self.state);
            return false;
        }
        let Some(handle) = self.handle.as_mut() else {
            log::warn!(target: "vizij_rig::task", "execute on a task without native handle");
            self.state = TaskState::Idle;
            return false;
        };

        self.state = TaskState::Executing;
        handle.update();
        self.changed_drawables = ArrayMarshaler::decode_dynamic_data(&mut self.snapshots, handle);
        self.execution = self.execution.next();
        self.state = TaskState::Executed;

        if self.release_pending {
            self.free_native();
        }
        true
    }

    /// Synchronous update. Fails when a run is already pending or in flight.
    pub fn update_now(&mut self) -> bool {
        if self.handle.is_none() {
            log::warn!(target: "vizij_rig::task", "update_now on a task without native handle");
            return false;
        }
        if self.state.is_in_flight() {
            log::debug!(target: "vizij_rig::task", "update_now refused: task {:?}", self.state);
            return false;
        }
        self.state = TaskState::Enqueued;
        self.execute()
    }

    /// Release the native handle, now or once the pending run completes.
    /// Returns true when the handle was freed by this call.
    pub fn release_unmanaged(&mut self) -> bool {
        self.release_pending = true;
        if self.state.is_in_flight() {
            log::debug!(target: "vizij_rig::task", "release deferred until execution completes");
            return false;
        }
        self.free_native()
    }

    fn free_native(&mut self) -> bool {
        self.release_pending = false;
        match self.handle.take() {
            Some(handle) => {
                log::debug!(
                    target: "vizij_rig::task",
                    "released native model of '{}' after {} updates",
                    handle.moc().name(),
                    handle.update_count()
                );
                true
            }
            None => false,
        }
    }
}
