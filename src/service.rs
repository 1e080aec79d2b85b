//! [`FileIndexService`]: the façade wiring the store, scheduler, walker,
//! processor, tokenizer, and watcher into the public surface callers use.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::error::IndexError;
use crate::processor::{FileProcessor, StreamingFileProcessor};
use crate::scheduler::{default_worker_count, CompletionHandle, Scheduler, Work};
use crate::store::IndexStore;
use crate::tokenizer::{DefaultTokenizer, TokenizationSession, Tokenizer};
use crate::types::{FilePath, Token};
use crate::walker::{IgnoreWalker, PathWalker};
use crate::watcher::{FileSystemWatcher, FsEvent, NotifyWatcher};

/// Concurrent file-indexing and phrase-search service.
///
/// Construct with [`FileIndexService::builder`]. The default builder wires
/// a [`StreamingFileProcessor`] over a [`DefaultTokenizer`], an
/// `.gitignore`-aware [`IgnoreWalker`], and a `notify`-backed
/// [`NotifyWatcher`] — swap any of those for a test double or a
/// domain-specific implementation via the builder.
pub struct FileIndexService {
    store: Arc<IndexStore>,
    scheduler: Arc<Scheduler>,
    walker: Arc<dyn PathWalker>,
    processor: Arc<dyn FileProcessor>,
    watcher: Arc<dyn FileSystemWatcher>,
    closed: AtomicBool,
}

impl FileIndexService {
    pub fn builder() -> FileIndexServiceBuilder {
        FileIndexServiceBuilder::default()
    }

    /// Walk `roots` and schedule every discovered file for indexing, then
    /// block until the whole batch has completed.
    ///
    /// Equivalent to calling [`FileIndexService::schedule_index`] followed
    /// by [`CompletionHandle::wait`] on the handle it returns.
    pub fn index(&self, roots: &[PathBuf]) {
        self.schedule_index(roots).wait();
    }

    /// Like [`FileIndexService::index`], but returns immediately with a
    /// handle the caller can wait on instead of blocking here.
    pub fn schedule_index(&self, roots: &[PathBuf]) -> CompletionHandle {
        if self.closed.load(Ordering::SeqCst) {
            return self.scheduler.completion_handle();
        }
        for root in roots {
            for path in self.walker.walk(root) {
                self.schedule_file(path);
            }
        }
        self.scheduler.completion_handle()
    }

    fn schedule_file(&self, path: FilePath) {
        let store = Arc::clone(&self.store);
        let processor = Arc::clone(&self.processor);
        let work = Work::new(
            |p: &FilePath| p.is_file(),
            move |p: &FilePath| {
                reindex_one(&store, &processor, p);
            },
        );
        self.scheduler.schedule(path, work);
    }

    /// Start watching `roots` for filesystem changes, dispatching Created,
    /// Modified, and Deleted events to the scheduler as they arrive. Errs
    /// with [`IndexError::AlreadyWatching`] if a watch is already active,
    /// or [`IndexError::ServiceClosed`] after [`FileIndexService::close`].
    pub fn start_watching(&self, roots: &[PathBuf]) -> Result<(), IndexError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(IndexError::ServiceClosed);
        }
        let store = Arc::clone(&self.store);
        let processor = Arc::clone(&self.processor);
        let scheduler = Arc::clone(&self.scheduler);

        // Deleted events bypass the scheduler entirely and hit the store
        // directly: deletions are cheap, and routing them through the same
        // in-flight/pending-rerun bookkeeping as reindexing would let a
        // rapid create-delete-create burst collapse into the wrong final
        // state. The race this opens up — a reindex already in flight for
        // `path` writing stale positions after the delete lands — is closed
        // by `reindex_one` re-checking `path.is_file()` on every run and
        // removing instead of writing when the file is gone.
        let sink: crate::watcher::EventSink = Arc::new(move |event| match event {
            FsEvent::Created(path) | FsEvent::Modified(path) => {
                let store = Arc::clone(&store);
                let processor = Arc::clone(&processor);
                let work = Work::new(
                    |p: &FilePath| p.is_file(),
                    move |p: &FilePath| reindex_one(&store, &processor, p),
                );
                scheduler.schedule(path, work);
            }
            FsEvent::Deleted(path) => {
                store.remove_file(&path);
            }
        });

        self.watcher.start_watching(roots, sink)
    }

    pub fn stop_watching(&self) {
        self.watcher.stop_watching();
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_watching()
    }

    /// Files whose token set contains `text`, normalized the same way a
    /// single indexed token is (lowercased, not split).
    ///
    /// Blank input returns an empty set immediately. Otherwise this blocks
    /// the calling thread until every file admitted to the scheduler
    /// before this call was made has finished its last-scheduled run, so
    /// the result reflects all indexing scheduled before the query.
    pub fn query(&self, text: &str) -> HashSet<FilePath> {
        if text.trim().is_empty() {
            return HashSet::new();
        }
        self.scheduler.completion_handle().wait();
        let token = crate::types::intern(&text.to_lowercase());
        self.store.query(&token)
    }

    /// Files in which the tokenized words of `text` appear at consecutive
    /// positions, in order. Same quiescence-blocking contract as
    /// [`FileIndexService::query`]; an empty token list returns empty
    /// immediately without waiting.
    pub fn query_phrase(&self, text: &str) -> HashSet<FilePath> {
        let tokens: Vec<Token> = tokenize_query(text);
        if tokens.is_empty() {
            return HashSet::new();
        }
        self.scheduler.completion_handle().wait();
        self.store.query_phrase(&tokens)
    }

    /// Like [`FileIndexService::query_phrase`], but takes already-split
    /// words, normalizing each individually rather than re-tokenizing.
    pub fn query_phrase_tokens(&self, tokens: &[String]) -> HashSet<FilePath> {
        if tokens.is_empty() {
            return HashSet::new();
        }
        self.scheduler.completion_handle().wait();
        let tokens: Vec<Token> = tokens.iter().map(|t| crate::types::intern(&t.to_lowercase())).collect();
        self.store.query_phrase(&tokens)
    }

    /// Snapshot of every indexed token and the files it appears in.
    pub fn dump(&self) -> HashMap<Token, HashSet<FilePath>> {
        self.store.dump()
    }

    /// Stop watching (if active), drain outstanding scheduled work, and
    /// release the worker pool. Idempotent; subsequent `start_watching`
    /// calls fail with [`IndexError::ServiceClosed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("closing file index service");
        self.watcher.stop_watching();
        self.scheduler.completion_handle().wait();
        self.scheduler.close();
    }
}

impl Drop for FileIndexService {
    fn drop(&mut self) {
        self.close();
    }
}

fn reindex_one(store: &IndexStore, processor: &dyn FileProcessor, path: &FilePath) {
    if !path.is_file() {
        store.remove_file(path);
        return;
    }
    match processor.process(path) {
        Ok(positions) => store.replace_file(path.clone(), positions, None),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read file during indexing; removing stale entry");
            store.remove_file(path);
        }
    }
}

/// Tokenizes free-form query text the same way [`DefaultTokenizer`] splits
/// file content, so `query_phrase("the quick brown")` lines up with what
/// was actually indexed.
fn tokenize_query(text: &str) -> Vec<Token> {
    let tokenizer = DefaultTokenizer::new();
    let mut session = tokenizer.start_session();
    let mut tokens = session.feed(text);
    tokens.extend(session.finish());
    tokens
}

/// Builder for [`FileIndexService`], defaulting every collaborator to the
/// crate's built-in implementation.
pub struct FileIndexServiceBuilder {
    worker_count: usize,
    tokenizer: Box<dyn Tokenizer>,
    walker: Arc<dyn PathWalker>,
    watcher: Arc<dyn FileSystemWatcher>,
}

impl Default for FileIndexServiceBuilder {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            tokenizer: Box::new(DefaultTokenizer::new()),
            walker: Arc::new(IgnoreWalker::new()),
            watcher: Arc::new(NotifyWatcher::new()),
        }
    }
}

impl FileIndexServiceBuilder {
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn walker(mut self, walker: Arc<dyn PathWalker>) -> Self {
        self.walker = walker;
        self
    }

    pub fn watcher(mut self, watcher: Arc<dyn FileSystemWatcher>) -> Self {
        self.watcher = watcher;
        self
    }

    pub fn build(self) -> FileIndexService {
        let processor: Arc<dyn FileProcessor> = Arc::new(StreamingFileProcessor::new(self.tokenizer));
        FileIndexService {
            store: Arc::new(IndexStore::new()),
            scheduler: Arc::new(Scheduler::new(self.worker_count)),
            walker: self.walker,
            processor,
            watcher: self.watcher,
            closed: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
