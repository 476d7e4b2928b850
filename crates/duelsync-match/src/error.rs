//! Error taxonomy for match operations.

use duelsync_protocol::{MatchSnapshot, ProtocolError};
use duelsync_store::StoreError;

/// Errors returned by the coordinator, lobby and matchmaker.
///
/// `VersionConflict` is a normal outcome under concurrent play, not a
/// failure: the caller rebases onto `current` and resubmits.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Malformed or missing input, wrong deck size, bad room code.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller may not use the referenced resource (e.g. a deck it
    /// does not own).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unknown room or match.
    #[error("not found: {0}")]
    NotFound(String),

    /// Room full, duplicate code, self-join, or a terminal match.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stale patch. `current` is the stored state to rebase onto.
    #[error("version conflict: expected {expected}, current is {}", current.version)]
    VersionConflict {
        expected: u64,
        current: Box<MatchSnapshot>,
    },

    /// The backing store is unavailable. Retry with backoff.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl MatchError {
    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) | Self::VersionConflict { .. } => 409,
            Self::Storage(_) => 503,
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::VersionConflict { .. } => "version_conflict",
            Self::Storage(_) => "storage",
        }
    }

    /// Returns `true` if the same request may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<StoreError> for MatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Self::NotFound(format!("match {key}")),
            StoreError::Duplicate(key) => {
                Self::Conflict(format!("room code {key} is taken"))
            }
            StoreError::VersionMismatch { expected, current } => {
                Self::VersionConflict {
                    expected,
                    current: Box::new(current.to_snapshot()),
                }
            }
            StoreError::Unavailable(reason) => Self::Storage(reason),
        }
    }
}

impl From<ProtocolError> for MatchError {
    fn from(err: ProtocolError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(MatchError::Validation("x".into()).status_code(), 400);
        assert_eq!(MatchError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(MatchError::NotFound("x".into()).status_code(), 404);
        assert_eq!(MatchError::Conflict("x".into()).status_code(), 409);
        assert_eq!(MatchError::Storage("x".into()).status_code(), 503);
    }

    #[test]
    fn test_only_storage_is_retryable() {
        assert!(MatchError::Storage("down".into()).is_retryable());
        assert!(!MatchError::Conflict("full".into()).is_retryable());
    }

    #[test]
    fn test_from_store_duplicate_is_conflict() {
        let err: MatchError = StoreError::Duplicate("ABC123".into()).into();
        assert!(matches!(err, MatchError::Conflict(ref m) if m.contains("ABC123")));
    }

    #[test]
    fn test_from_protocol_error_is_validation() {
        let err: MatchError = ProtocolError::InvalidRoomCode("!".into()).into();
        assert_eq!(err.kind(), "validation");
    }
}
