//! Error types for the protocol layer.

/// Errors that can occur while decoding, encoding, or validating messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or an
    /// unknown event tag.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A field passed deserialization but violates a protocol rule
    /// (bad room code, display name too long, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The client's protocol MAJOR version does not match the host's.
    #[error("protocol version mismatch: host {host}, client {client}")]
    VersionMismatch { host: String, client: String },

    /// The message is invalid at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
