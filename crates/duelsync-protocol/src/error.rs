//! Error types for the protocol layer.

/// Errors that can occur while parsing identifiers or (de)serializing
/// relay envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown `type` tag, or a
    /// payload of the wrong shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room code that is empty, too short or long, or contains
    /// characters outside `[A-Za-z0-9]`.
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),

    /// The message decoded but is not valid in this direction or context.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
