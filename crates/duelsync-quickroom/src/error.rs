//! Error types for the quick-room registry.

use duelsync_store::StoreError;

/// Errors returned by [`QuickRoomRegistry`](crate::QuickRoomRegistry).
#[derive(Debug, thiserror::Error)]
pub enum QuickRoomError {
    /// Wrong deck size or an unusable mode/difficulty combination.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No live room under this id. Expired rooms report this too.
    #[error("quick room {0} not found")]
    NotFound(String),

    /// The backing store failed or the room kept changing underneath us.
    /// Safe to retry.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl QuickRoomError {
    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Storage(_) => 503,
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<StoreError> for QuickRoomError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Self::NotFound(key),
            other => Self::Storage(other.to_string()),
        }
    }
}
