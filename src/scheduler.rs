//! The indexing scheduler: the executor that serializes concurrent
//! re-indexing of the same file, coalesces rapid-fire updates, and exposes
//! a batch-completion handle so queries can observe a quiescent state.
//!
//! # Core algorithm
//!
//! A single table drives everything here: `active`, a map from path to
//! `None` ("currently being processed, no rerun queued") or `Some(work)`
//! ("currently being processed, and this rerun is queued to run next —
//! latest wins"). A path not in the table isn't outstanding at all.
//!
//! `schedule(path, work)` either inserts a fresh `active[path] = None`
//! entry and submits a worker job (if `path` wasn't already outstanding),
//! or overwrites `active[path]` with `Some(work)` (if it was already
//! outstanding). When a worker finishes a job it consults `active[path]`
//! one more time before declaring the path done: if a rerun is queued it
//! resubmits with the stored work instead of removing the path, so a file
//! under a burst of schedules never leaves the batch until no rerun
//! remains queued (see `SPEC_FULL.md` §4.2 "batch semantics").
//!
//! Every read-then-write on `active` — whether from `schedule()` admitting
//! new work or a worker finishing a job and deciding whether to rerun or
//! finalize — happens under the same `batch` lock that also owns the
//! outstanding-batch signal. That's what keeps admission and finish
//! decisions for the same path from interleaving: a `schedule()` call
//! racing a worker's finish can only ever observe the table strictly
//! before or strictly after the worker's decision, never in between, so a
//! `completion_handle()` obtained while a path is outstanding can never
//! fire before every schedule admitted before it has actually completed
//! (`SPEC_FULL.md` §9 "batch future races").

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::types::FilePath;

/// A unit of schedulable work: the gate that decides whether a path is
/// still indexable, and the closure that performs the (re-)index and
/// mutates the store. Both halves are `Arc`s so the same work can be
/// cloned into an outstanding path's rerun slot without re-capturing state.
#[derive(Clone)]
pub struct Work {
    can_process: Arc<dyn Fn(&FilePath) -> bool + Send + Sync>,
    apply: Arc<dyn Fn(&FilePath) + Send + Sync>,
}

impl Work {
    pub fn new(
        can_process: impl Fn(&FilePath) -> bool + Send + Sync + 'static,
        apply: impl Fn(&FilePath) + Send + Sync + 'static,
    ) -> Self {
        Self { can_process: Arc::new(can_process), apply: Arc::new(apply) }
    }
}

struct Job {
    path: FilePath,
    work: Work,
}

/// Worker-pool sizing the teacher's indexers use: at least two threads,
/// scaling with the machine.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).max(2)
}

/// Internal condition-variable latch backing a [`CompletionHandle`].
struct Signal {
    done: Mutex<bool>,
    cv: Condvar,
}

impl Signal {
    fn new() -> Self {
        Self { done: Mutex::new(false), cv: Condvar::new() }
    }

    fn complete(&self) {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        *done = true;
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        while !*done {
            done = self.cv.wait(done).unwrap_or_else(|e| e.into_inner());
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        while !*done {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, result) = self
                .cv
                .wait_timeout(done, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            done = guard;
            if result.timed_out() && !*done {
                return false;
            }
        }
        true
    }
}

/// Handle completing when every file in the batch outstanding at the time
/// it was obtained has finished its last-scheduled run.
///
/// A handle obtained while no work is outstanding is already complete.
#[derive(Clone)]
pub struct CompletionHandle {
    signal: Option<Arc<Signal>>,
}

impl CompletionHandle {
    fn already_complete() -> Self {
        Self { signal: None }
    }

    fn pending(signal: Arc<Signal>) -> Self {
        Self { signal: Some(signal) }
    }

    /// Block the calling thread until the batch is quiescent.
    pub fn wait(&self) {
        if let Some(signal) = &self.signal {
            signal.wait();
        }
    }

    /// Block up to `timeout`, returning whether the batch became quiescent
    /// within that window.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match &self.signal {
            Some(signal) => signal.wait_timeout(timeout),
            None => true,
        }
    }

    /// True if the batch this handle was obtained for has already quiesced.
    pub fn is_complete(&self) -> bool {
        match &self.signal {
            Some(signal) => *signal.done.lock().unwrap_or_else(|e| e.into_inner()),
            None => true,
        }
    }
}

/// `None`: the path is outstanding with no rerun queued. `Some(work)`: the
/// path is outstanding and this is the latest-wins work to run once the
/// current job finishes.
type ActiveSlot = Option<Work>;

struct BatchState {
    active: HashMap<FilePath, ActiveSlot>,
    current: Option<Arc<Signal>>,
}

struct Core {
    batch: Mutex<BatchState>,
    sender: Mutex<Option<Sender<Job>>>,
}

impl Core {
    fn schedule_inner(self: &Arc<Self>, path: FilePath, work: Work) {
        if !(work.can_process)(&path) {
            return;
        }

        let work = {
            let mut batch = self.batch.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = batch.active.get_mut(&path) {
                // Already outstanding: latest-wins overwrite of any queued
                // rerun. No job to submit — the path is already running
                // (or waiting to) and will pick this up when it finishes.
                *slot = Some(work);
                None
            } else {
                if batch.active.is_empty() {
                    batch.current = Some(Arc::new(Signal::new()));
                }
                batch.active.insert(path.clone(), None);
                Some(work)
            }
        };

        let Some(work) = work else { return };

        let sent = {
            let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
            match sender.as_ref() {
                Some(sender) => sender.send(Job { path: path.clone(), work }).is_ok(),
                None => false,
            }
        };

        // Closed-after-registration races are rare but possible; if the send
        // failed the job is dropped and we must still unwind the bookkeeping
        // we just did, same as a completed-but-empty run.
        if !sent {
            self.finish_or_rerun(path);
        }
    }

    /// Atomically decide, under the single `batch` lock, whether `path`'s
    /// outstanding entry should be removed (declaring it done, and
    /// completing the batch signal if nothing else is outstanding) or kept
    /// because a rerun was queued while the job ran. Doing this check and
    /// the outstanding-set mutation as one critical section is what stops a
    /// `schedule()` call racing a worker's finish from ever observing the
    /// path as briefly absent.
    fn finish_or_rerun(self: &Arc<Self>, path: FilePath) {
        let rerun = {
            let mut batch = self.batch.lock().unwrap_or_else(|e| e.into_inner());
            match batch.active.remove(&path) {
                Some(Some(work)) => {
                    // A rerun is queued: the path stays outstanding under
                    // this same slot, now empty again, while we resubmit.
                    batch.active.insert(path.clone(), None);
                    Some(work)
                }
                Some(None) => {
                    if batch.active.is_empty() {
                        if let Some(signal) = batch.current.take() {
                            signal.complete();
                        }
                    }
                    None
                }
                None => None,
            }
        };

        if let Some(work) = rerun {
            let sent = {
                let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
                match sender.as_ref() {
                    Some(sender) => sender.send(Job { path: path.clone(), work }).is_ok(),
                    None => false,
                }
            };
            if !sent {
                self.finish_or_rerun(path);
            }
        }
    }

    fn run_job(self: &Arc<Self>, job: Job) {
        let Job { path, work } = job;

        if catch_unwind(AssertUnwindSafe(|| (work.apply)(&path))).is_err() {
            tracing::warn!(path = %path.display(), "apply panicked during scheduled indexing");
        }

        self.finish_or_rerun(path);
    }
}

/// Thread-pool executor that dedupes concurrent indexing of the same file.
pub struct Scheduler {
    core: Arc<Core>,
    workers: Mutex<Option<Vec<JoinHandle<()>>>>,
}

impl Scheduler {
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = unbounded();
        let core = Arc::new(Core {
            batch: Mutex::new(BatchState { active: HashMap::new(), current: None }),
            sender: Mutex::new(Some(sender)),
        });

        let workers = (0..worker_count)
            .map(|_| {
                let core = Arc::clone(&core);
                let receiver = receiver.clone();
                std::thread::spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        core.run_job(job);
                    }
                })
            })
            .collect();

        Self { core, workers: Mutex::new(Some(workers)) }
    }

    /// Request that `path` be (re-)indexed. A no-op if `work.can_process(path)`
    /// is false or the scheduler has been closed.
    pub fn schedule(&self, path: FilePath, work: Work) {
        self.core.schedule_inner(path, work);
    }

    /// A handle completing when every file in the current batch has
    /// finished its last-scheduled run. Pre-completed if nothing is
    /// outstanding.
    pub fn completion_handle(&self) -> CompletionHandle {
        let batch = self.core.batch.lock().unwrap_or_else(|e| e.into_inner());
        if batch.active.is_empty() {
            CompletionHandle::already_complete()
        } else {
            CompletionHandle::pending(batch.current.clone().expect("outstanding batch has a signal"))
        }
    }

    /// Stop accepting work and shut down workers. Idempotent; in-flight
    /// `apply` calls are allowed to finish, pending reruns are dropped.
    pub fn close(&self) {
        let sender = self.core.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(sender); // drops the last Sender clone, disconnecting workers' recv()

        let workers = self.workers.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(workers) = workers {
            for handle in workers {
                let _ = handle.join();
            }
        }
    }

    #[cfg(test)]
    fn is_closed(&self) -> bool {
        self.core.sender.lock().unwrap().is_none()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
