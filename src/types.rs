//! Core data model: file identity, tokens, and positions.
//!
//! Kept deliberately thin — the store, scheduler, and watcher modules own
//! the behavior; this module only names the vocabulary shared between
//! them, the same way the teacher crate keeps `Posting`/`ContentIndex`
//! as plain data in `lib.rs` with behavior living in `index.rs` and
//! `mcp/watcher.rs`.

use std::path::PathBuf;
use std::sync::Arc;

/// Identity of an indexed file. A plain `PathBuf` is already hashable and
/// ordered, so there is no need for an opaque newtype wrapper.
pub type FilePath = PathBuf;

/// A normalized, non-empty token as produced by a [`crate::tokenizer::Tokenizer`].
///
/// `Arc<str>` rather than `String`: the same token string is held by both
/// the inverted index and the per-file record (invariant I2), so interning
/// the allocation avoids duplicating every token on every reindex.
pub type Token = Arc<str>;

/// 0-based ordinal of a token within a file's global token stream.
pub type Position = u32;

/// Ordered, strictly increasing positions for a single (token, file) pair.
pub type PositionList = Vec<Position>;

/// Intern a borrowed token string into the shared `Arc<str>` representation.
pub fn intern(token: &str) -> Token {
    Arc::from(token)
}
