//! Error types for the room runtime.
//!
//! Errors are data: every public room operation returns one of these, and
//! each maps onto a wire [`ErrorCode`] via [`RoomError::code`]. Only
//! invariant violations (bugs) ever panic, and those are confined to the
//! offending room's actor task.

use std::time::Duration;

use parlor_protocol::{ErrorCode, PlayerId, RoomCode};

use crate::GameError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room registered under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room has no free player slots.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The room's lifecycle state does not accept joins.
    #[error("room {0} is not joinable")]
    NotJoinable(RoomCode),

    /// A lifecycle transition outside the legal table was attempted.
    /// State is left unchanged.
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// The player is not a member of this room.
    #[error("player {0} is not in the room")]
    NotInRoom(PlayerId),

    /// No strategy is registered under this command type.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// Strategy execution exceeded its wall-clock budget; the outcome was
    /// discarded before any state change.
    #[error("command exceeded its {budget:?} budget")]
    CommandTimeout { budget: Duration },

    /// Only the originator of the most recent command may undo it.
    #[error("undo refused: caller did not submit the last command")]
    UndoForbidden,

    /// A domain rejection produced by a strategy (not your turn, illegal
    /// move, insufficient balance, ...). Carried verbatim to the client.
    #[error("{code}: {message}")]
    Rejected { code: ErrorCode, message: String },

    /// The process-wide room limit is reached.
    #[error("room limit reached")]
    RoomLimit,

    /// Room code generation kept colliding (registry effectively full).
    #[error("could not allocate a free room code")]
    CodeExhausted,

    /// An inbound field failed validation inside the room layer.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The room's actor is gone (terminated or crashed).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// Game setup or state decoding failed.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    /// The wire error code surfaced to clients for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::NotJoinable(_) => ErrorCode::RoomNotJoinable,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::NotInRoom(_) => ErrorCode::ValidationError,
            Self::UnknownCommand(_) => ErrorCode::UnknownCommand,
            Self::CommandTimeout { .. } => ErrorCode::CommandTimeout,
            Self::UndoForbidden => ErrorCode::UndoForbidden,
            Self::Rejected { code, .. } => *code,
            Self::RoomLimit | Self::CodeExhausted => ErrorCode::RateLimit,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Unavailable(_) => ErrorCode::RoomTerminated,
            Self::Game(_) => ErrorCode::ValidationError,
        }
    }
}
