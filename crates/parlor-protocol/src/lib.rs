//! Wire protocol for Parlor.
//!
//! This crate defines the language that clients and the host speak:
//!
//! - **Types** ([`ClientEnvelope`], [`ClientEvent`], [`ServerEvent`],
//!   [`ErrorCode`], etc.) — the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Validation** ([`validate_room_code`], [`validate_display_name`],
//!   [`validate_game_id`]) — field-level rules enforced before any message
//!   reaches the room runtime.
//!
//! The protocol layer sits between transport (raw bytes) and the room
//! runtime. It knows nothing about connections, sessions, or rooms — only
//! how messages are shaped.

mod codec;
mod error;
mod types;
mod validate;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ChatKind, ClientEnvelope, ClientEvent, DeltaOp, ErrorCode, GameMode,
    LobbyPlayer, PlayerId, RoomCode, RoomStatus, ServerEnvelope, ServerEvent,
    SessionId, SyncReason, PROTOCOL_VERSION,
};
pub use validate::{
    validate_display_name, validate_envelope, validate_game_id,
    validate_room_code,
};
