//! The positional inverted index: the one CORE data structure every query
//! ultimately reads from.
//!
//! # Sharding strategy
//!
//! The store is partitioned into a fixed number of shards, each owning a
//! disjoint subset of files (chosen by hashing the file path). A shard
//! holds both directions of the index for the files it owns: the forward
//! view (`file -> token -> positions`) and the reverse view
//! (`token -> file -> positions`), restricted to its own files.
//!
//! This gives exactly the concurrency contract the spec asks for without
//! the usual cross-shard-consistency headache: because a single file's
//! *entire* record (forward and reverse) lives in exactly one shard,
//! `replace_file` only ever needs one shard's write lock to be atomic
//! (I4), and a phrase query only ever needs to re-check a candidate
//! file's other tokens inside that same shard — never across shards.
//! Mutations on files that hash to different shards never contend.
//!
//! `query`/`query_phrase` still have to visit every shard (a token can be
//! owned by files scattered across all of them), but that's a handful of
//! read-lock acquisitions, not the sequential table scan the naive
//! single-map design would need.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::RwLock;

use crate::types::{FilePath, Position, PositionList, Token};

const NUM_SHARDS: usize = 16;

#[derive(Default)]
struct Shard {
    /// file -> token -> positions, for files owned by this shard.
    files: HashMap<FilePath, HashMap<Token, PositionList>>,
    /// token -> file -> positions, restricted to files owned by this shard.
    inverted: HashMap<Token, HashMap<FilePath, PositionList>>,
}

impl Shard {
    fn remove_file_locked(&mut self, path: &FilePath) -> HashSet<Token> {
        let Some(old) = self.files.remove(path) else {
            return HashSet::new();
        };
        for token in old.keys() {
            if let Some(postings) = self.inverted.get_mut(token) {
                postings.remove(path);
                if postings.is_empty() {
                    self.inverted.remove(token);
                }
            }
        }
        old.into_keys().collect()
    }

    fn insert_file_locked(&mut self, path: FilePath, new_positions: HashMap<Token, PositionList>) {
        for (token, positions) in &new_positions {
            if positions.is_empty() {
                continue;
            }
            self.inverted
                .entry(token.clone())
                .or_default()
                .insert(path.clone(), positions.clone());
        }
        if new_positions.is_empty() {
            self.files.remove(&path);
        } else {
            self.files.insert(path, new_positions);
        }
    }
}

/// Concurrent positional inverted index.
///
/// See the module docs for the sharding strategy that makes
/// [`IndexStore::replace_file`] atomic per file without a global lock.
pub struct IndexStore {
    shards: Vec<RwLock<Shard>>,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| RwLock::new(Shard::default())).collect();
        Self { shards }
    }

    fn shard_index(&self, path: &FilePath) -> usize {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    fn shard_for(&self, path: &FilePath) -> &RwLock<Shard> {
        &self.shards[self.shard_index(path)]
    }

    /// Atomically replace the token set and positions recorded for `path`.
    ///
    /// Any token present in the prior entry but absent from `new_positions`
    /// is removed from the inverted index for `path`.
    ///
    /// `hint_old_tokens` exists for API parity with stores that cannot
    /// recover a file's prior token set on their own. Because a shard holds
    /// both the forward and reverse index for every file it owns under a
    /// single lock, this store never loses that information between a
    /// caller's `tokens_of` read and its `replace_file` write — the hint is
    /// accepted but unused here.
    pub fn replace_file(
        &self,
        path: FilePath,
        new_positions: HashMap<Token, PositionList>,
        _hint_old_tokens: Option<HashSet<Token>>,
    ) {
        let shard_lock = self.shard_for(&path);
        let mut shard = shard_lock.write().unwrap_or_else(|e| e.into_inner());

        shard.remove_file_locked(&path);
        let keep: HashMap<Token, PositionList> = new_positions
            .into_iter()
            .filter(|(_, positions)| !positions.is_empty())
            .collect();
        shard.insert_file_locked(path, keep);
    }

    /// Remove `path` from all postings and from the file index.
    /// Returns the token set that was associated with `path` (empty if none).
    pub fn remove_file(&self, path: &FilePath) -> HashSet<Token> {
        let shard_lock = self.shard_for(path);
        let mut shard = shard_lock.write().unwrap_or_else(|e| e.into_inner());
        shard.remove_file_locked(path)
    }

    /// Files whose posting contains `token`.
    pub fn query(&self, token: &Token) -> HashSet<FilePath> {
        let mut result = HashSet::new();
        for shard_lock in &self.shards {
            let shard = shard_lock.read().unwrap_or_else(|e| e.into_inner());
            if let Some(postings) = shard.inverted.get(token) {
                result.extend(postings.keys().cloned());
            }
        }
        result
    }

    /// Files in which `phrase` appears in consecutive positions.
    ///
    /// `k == 0` returns empty; `k == 1` degenerates to [`IndexStore::query`].
    pub fn query_phrase(&self, phrase: &[Token]) -> HashSet<FilePath> {
        match phrase.len() {
            0 => return HashSet::new(),
            1 => return self.query(&phrase[0]),
            _ => {}
        }

        let mut result = HashSet::new();
        for shard_lock in &self.shards {
            let shard = shard_lock.read().unwrap_or_else(|e| e.into_inner());
            let Some(first_postings) = shard.inverted.get(&phrase[0]) else {
                continue;
            };
            'file: for (file, positions) in first_postings {
                for &start in positions {
                    if phrase_matches_at(&shard, file, &phrase[1..], start) {
                        result.insert(file.clone());
                        continue 'file;
                    }
                }
            }
        }
        result
    }

    /// Key set of the per-file record for `path`, or `None` if absent.
    pub fn tokens_of(&self, path: &FilePath) -> Option<HashSet<Token>> {
        let shard_lock = self.shard_for(path);
        let shard = shard_lock.read().unwrap_or_else(|e| e.into_inner());
        shard.files.get(path).map(|m| m.keys().cloned().collect())
    }

    /// Snapshot of token -> file set, for inspection/testing.
    pub fn dump(&self) -> HashMap<Token, HashSet<FilePath>> {
        let mut result: HashMap<Token, HashSet<FilePath>> = HashMap::new();
        for shard_lock in &self.shards {
            let shard = shard_lock.read().unwrap_or_else(|e| e.into_inner());
            for (token, postings) in &shard.inverted {
                result.entry(token.clone()).or_default().extend(postings.keys().cloned());
            }
        }
        result
    }

    /// Snapshot of token -> file -> positions, for callers that need more
    /// than set membership (`SPEC_FULL.md` §4.4 — optional debug hook).
    pub fn dump_positional(&self) -> HashMap<Token, HashMap<FilePath, PositionList>> {
        let mut result: HashMap<Token, HashMap<FilePath, PositionList>> = HashMap::new();
        for shard_lock in &self.shards {
            let shard = shard_lock.read().unwrap_or_else(|e| e.into_inner());
            for (token, postings) in &shard.inverted {
                result.entry(token.clone()).or_default().extend(
                    postings.iter().map(|(f, p)| (f.clone(), p.clone())),
                );
            }
        }
        result
    }

    /// Remove all state.
    pub fn clear(&self) {
        for shard_lock in &self.shards {
            let mut shard = shard_lock.write().unwrap_or_else(|e| e.into_inner());
            shard.files.clear();
            shard.inverted.clear();
        }
    }
}

/// Check whether `rest` (the phrase's tokens after the first) all land at
/// consecutive positions `start+1, start+2, ...` within `shard`, for `file`.
fn phrase_matches_at(shard: &Shard, file: &FilePath, rest: &[Token], start: Position) -> bool {
    for (i, token) in rest.iter().enumerate() {
        let offset = start + 1 + i as Position;
        let Some(postings) = shard.inverted.get(token) else {
            return false;
        };
        let Some(positions) = postings.get(file) else {
            return false;
        };
        if positions.binary_search(&offset).is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
