//! Error types for the storage layer.

use crate::MatchRecord;

/// Errors returned by [`KeyValueStore`](crate::KeyValueStore) and
/// [`MatchStore`](crate::MatchStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists under the given key or room code.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A record with the same unique key already exists.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// The conditional update's expected version did not match.
    ///
    /// Carries the record as currently stored so the caller can rebase.
    #[error("version mismatch: expected {expected}, found {}", current.version)]
    VersionMismatch {
        expected: u64,
        current: Box<MatchRecord>,
    },

    /// The backing store could not be reached. Safe to retry: every
    /// mutation is idempotent or version-guarded.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
