//! Filesystem watching: turning OS-level change notifications into the
//! [`FsEvent`]s the service forwards to the scheduler.
//!
//! Built on `notify`, the same crate and debounce-by-channel shape the
//! teacher's `mcp::watcher` module uses, generalized from one hardcoded
//! content index to an injectable callback so the service can wire it
//! straight to [`crate::scheduler::Scheduler::schedule`].

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcherTrait};
use tracing::{debug, warn};

use crate::error::IndexError;
use crate::types::FilePath;
use crate::walker::{IgnoreWalker, PathWalker};

/// A single filesystem change, already resolved to one of the three kinds
/// the rest of the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Created(FilePath),
    Modified(FilePath),
    Deleted(FilePath),
}

/// Callback invoked once per [`FsEvent`], in dispatch order.
pub type EventSink = Arc<dyn Fn(FsEvent) + Send + Sync>;

/// Lifecycle surface for a recursive filesystem watch.
pub trait FileSystemWatcher: Send + Sync {
    /// Begin watching `roots` recursively, forwarding every change to
    /// `sink`. Roots that do not exist are skipped with a warning rather
    /// than failing the whole call — they may simply not have been
    /// created yet.
    fn start_watching(&self, roots: &[PathBuf], sink: EventSink) -> Result<(), IndexError>;

    /// Stop the active watch, if any. Idempotent.
    fn stop_watching(&self);

    fn is_watching(&self) -> bool;
}

struct ActiveWatch {
    _watcher: RecommendedWatcher,
    stop_tx: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

/// `notify`-backed [`FileSystemWatcher`].
pub struct NotifyWatcher {
    active: Mutex<Option<ActiveWatch>>,
}

impl Default for NotifyWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyWatcher {
    pub fn new() -> Self {
        Self { active: Mutex::new(None) }
    }
}

impl FileSystemWatcher for NotifyWatcher {
    fn start_watching(&self, roots: &[PathBuf], sink: EventSink) -> Result<(), IndexError> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.is_some() {
            return Err(IndexError::AlreadyWatching);
        }

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;

        let mut watched_any = false;
        for root in roots {
            if !root.exists() {
                warn!(root = %root.display(), "watch root does not exist yet, skipping");
                continue;
            }
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => watched_any = true,
                Err(e) => warn!(root = %root.display(), error = %e, "failed to register watch root"),
            }
        }
        if !watched_any {
            debug!("no watch roots registered; watcher thread still starts for later start_watching calls");
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let walker = IgnoreWalker::new();
        let thread = std::thread::spawn(move || dispatch_loop(rx, stop_rx, sink, walker));

        *active = Some(ActiveWatch { _watcher: watcher, stop_tx, thread: Some(thread) });
        Ok(())
    }

    fn stop_watching(&self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut watch) = active.take() {
            let _ = watch.stop_tx.send(());
            if let Some(thread) = watch.thread.take() {
                let _ = thread.join();
            }
        }
    }

    fn is_watching(&self) -> bool {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl Drop for NotifyWatcher {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

fn dispatch_loop(
    rx: mpsc::Receiver<notify::Result<Event>>,
    stop_rx: mpsc::Receiver<()>,
    sink: EventSink,
    walker: IgnoreWalker,
) {
    loop {
        if stop_rx.try_recv().is_ok() {
            return;
        }
        match rx.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(Ok(event)) => handle_event(event, &sink, &walker),
            Ok(Err(e)) => {
                // notify surfaces watch-queue overflow as an error variant
                // rather than an event; discard and keep watching rather
                // than treat it as fatal.
                warn!(error = %e, "filesystem watcher error, event discarded");
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn handle_event(event: Event, sink: &EventSink, walker: &IgnoreWalker) {
    match event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                dispatch_created(path, sink, walker);
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                if path.is_file() {
                    sink(FsEvent::Modified(path.clone()));
                }
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                sink(FsEvent::Deleted(path.clone()));
            }
        }
        _ => {}
    }
}

/// Dispatch a `Created` event for `path`. If `path` is a directory — a new
/// subtree appearing all at once, which some backends report as a single
/// create on the directory rather than one event per file — walk it and
/// dispatch `Created` for every file inside before returning, so the
/// scheduler always observes a file's creation before any later event
/// referencing it.
fn dispatch_created(path: &Path, sink: &EventSink, walker: &IgnoreWalker) {
    if path.is_dir() {
        let mut files = walker.walk(path);
        files.sort();
        for file in files {
            sink(FsEvent::Created(file));
        }
    } else if path.is_file() {
        sink(FsEvent::Created(path.to_path_buf()));
    }
}
