//! Error types for the session layer.

use parlor_protocol::SessionId;

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists under this id.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The inbound sequence number fell behind the replay window, or was
    /// already accepted on this session.
    #[error("replayed sequence {seq} (highest accepted {highest})")]
    ReplayRejected { seq: u64, highest: u64 },
}
