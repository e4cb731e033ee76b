//! Where enqueued tasks execute.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::config::DispatchMode;
use crate::task::SharedTask;

/// Receives tasks that just transitioned to `Enqueued`.
pub trait TaskDispatcher: Send + Sync {
    fn dispatch(&self, task: SharedTask);

    /// Complete every task handed over so far. Returns the number of tasks run by
    /// this call, 0 for dispatchers that never hold work back.
    fn flush(&self) -> usize {
        0
    }
}

/// Build the dispatcher selected by `mode`.
pub fn dispatcher_for(mode: DispatchMode) -> Arc<dyn TaskDispatcher> {
    match mode {
        DispatchMode::Inline => Arc::new(InlineDispatcher),
        DispatchMode::Deferred => Arc::new(DeferredQueue::default()),
        DispatchMode::Worker => Arc::new(WorkerDispatcher::spawn()),
    }
}

/// Executes on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl TaskDispatcher for InlineDispatcher {
    fn dispatch(&self, task: SharedTask) {
        task.lock().execute();
    }
}

/// Holds tasks until the host drains them with [`DeferredQueue::run_pending`].
#[derive(Default)]
pub struct DeferredQueue {
    pending: Mutex<Vec<SharedTask>>,
}

impl DeferredQueue {
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Execute everything queued so far, in dispatch order.
    pub fn run_pending(&self) -> usize {
        let drained = std::mem::take(&mut *self.pending.lock());
        let mut ran = 0;
        for task in drained {
            if task.lock().execute() {
                ran += 1;
            }
        }
        ran
    }
}

impl TaskDispatcher for DeferredQueue {
    fn dispatch(&self, task: SharedTask) {
        self.pending.lock().push(task);
    }

    fn flush(&self) -> usize {
        self.run_pending()
    }
}

enum Job {
    Run(SharedTask),
    Flush(Sender<usize>),
}

/// One background thread fed over a channel. Dropping the dispatcher closes the
/// channel and joins the thread after it drained the remaining jobs.
pub struct WorkerDispatcher {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl WorkerDispatcher {
    pub fn spawn() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let worker = std::thread::Builder::new()
            .name("vizij-rig-worker".into())
            .spawn(move || worker_loop(receiver));
        match worker {
            Ok(worker) => Self {
                sender: Some(sender),
                worker: Some(worker),
            },
            Err(err) => {
                log::error!(target: "vizij_rig::dispatch", "failed to spawn worker thread: {err}");
                Self {
                    sender: None,
                    worker: None,
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

fn worker_loop(receiver: Receiver<Job>) {
    let mut ran = 0usize;
    for job in receiver.iter() {
        match job {
            Job::Run(task) => {
                if task.lock().execute() {
                    ran += 1;
                }
            }
            Job::Flush(reply) => {
                // the caller may have given up waiting
                let _ = reply.send(ran);
                ran = 0;
            }
        }
    }
}

impl TaskDispatcher for WorkerDispatcher {
    fn dispatch(&self, task: SharedTask) {
        let Some(sender) = &self.sender else {
            // no worker: keep the task from staying enqueued forever
            task.lock().execute();
            return;
        };
        if let Err(err) = sender.send(Job::Run(task)) {
            log::warn!(target: "vizij_rig::dispatch", "worker gone; executing inline");
            if let Job::Run(task) = err.into_inner() {
                task.lock().execute();
            }
        }
    }

    /// Blocks until the worker processed every job sent before this call.
    fn flush(&self) -> usize {
        let Some(sender) = &self.sender else {
            return 0;
        };
        let (reply, done) = crossbeam_channel::bounded(1);
        if sender.send(Job::Flush(reply)).is_err() {
            return 0;
        }
        done.recv().unwrap_or(0)
    }
}

impl Drop for WorkerDispatcher {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!(target: "vizij_rig::dispatch", "worker thread panicked");
            }
        }
    }
}
