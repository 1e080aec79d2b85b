//! # fileindex — concurrent file-indexing and phrase-search library
//!
//! A positional inverted index over a directory tree, kept up to date by
//! a dedicating, coalescing indexing scheduler and an optional filesystem
//! watcher. Callers get exact-token and consecutive-phrase search over
//! whatever's currently indexed; there is no ranking, fuzzy matching, or
//! on-disk persistence — see [`SPEC_FULL.md`] in the repository root for
//! the full contract.
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::PathBuf;
//! use fileindex::FileIndexService;
//!
//! let service = FileIndexService::builder().build();
//! service.index(&[PathBuf::from("./src")]);
//! let hits = service.query("kotlin");
//! ```
//!
//! Most callers only need [`FileIndexService`]; the collaborator traits
//! ([`Tokenizer`], [`FileProcessor`], [`PathWalker`], [`FileSystemWatcher`])
//! are exposed for swapping in a domain-specific implementation via
//! [`FileIndexServiceBuilder`].

pub mod error;
pub mod processor;
pub mod scheduler;
pub mod store;
pub mod tokenizer;
pub mod types;
pub mod walker;
pub mod watcher;

mod service;

pub use error::IndexError;
pub use processor::{FileProcessor, StreamingFileProcessor};
pub use scheduler::{default_worker_count, CompletionHandle, Scheduler, Work};
pub use service::{FileIndexService, FileIndexServiceBuilder};
pub use store::IndexStore;
pub use tokenizer::{DefaultTokenizer, Tokenizer, TokenizationSession};
pub use types::{intern, FilePath, Position, PositionList, Token};
pub use walker::{IgnoreWalker, PathWalker};
pub use watcher::{FileSystemWatcher, FsEvent, NotifyWatcher};
