//! Unified error type for the indexing service's lifecycle edges.
//!
//! Most store and scheduler operations are infallible by design: I/O
//! failures, swallowed `apply` panics, and watcher overflow are all
//! handled internally and logged, never surfaced as `Result`s.
//! `IndexError` covers only the handful of places the spec names an
//! explicit failure.

use thiserror::Error;

/// All errors that can occur while operating a [`crate::FileIndexService`].
#[derive(Error, Debug)]
pub enum IndexError {
    /// `start_watching` was called while a watch subscription was already active.
    #[error("already watching: call stop_watching() or close() first")]
    AlreadyWatching,

    /// An operation was attempted after `close()`.
    #[error("service is closed")]
    ServiceClosed,

    /// A lock guarding shared scheduler or store state was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// The native filesystem watcher failed to initialize or register a root.
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_watching_display() {
        let err = IndexError::AlreadyWatching;
        assert!(err.to_string().contains("already watching"));
    }

    #[test]
    fn service_closed_display() {
        let err = IndexError::ServiceClosed;
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn lock_poisoned_display_contains_detail() {
        let err = IndexError::LockPoisoned("inverted index shard 3".to_string());
        assert!(err.to_string().contains("inverted index shard 3"));
    }

    #[test]
    fn watcher_error_wraps_source() {
        let notify_err = notify::Error::generic("boom");
        let err: IndexError = notify_err.into();
        assert!(matches!(err, IndexError::Watcher(_)));
        assert!(err.to_string().contains("boom"));
    }
}
