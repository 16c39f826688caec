//! Unified error type for the Parlor host.

use parlor_protocol::ProtocolError;
use parlor_room::RoomError;
use parlor_session::SessionError;
use parlor_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum ParlorError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (decode, validation, version mismatch).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown session, replay rejection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, invalid transition, ...).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::RoomCode;

    #[test]
    fn test_from_transport_error() {
        let err: ParlorError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, ParlorError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_room_error() {
        let code = RoomCode::parse("ABC123").unwrap();
        let err: ParlorError = RoomError::NotFound(code).into();
        assert!(matches!(err, ParlorError::Room(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ParlorError = ProtocolError::Validation("bad".into()).into();
        assert!(matches!(err, ParlorError::Protocol(_)));
    }
}
