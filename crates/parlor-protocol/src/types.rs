//! Core protocol types for Parlor's wire format.
//!
//! Everything in this module is serialized to JSON and crosses the network
//! boundary. Field names are camelCase on the wire to match the client SDK;
//! event enums use adjacent tagging (`{"event": "...", "data": {...}}`).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version advertised by the host. Clients must send an envelope
/// version with a matching MAJOR component or be rejected.
pub const PROTOCOL_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable, opaque player identity.
///
/// Survives disconnects: a rejoining player presents the same id and is
/// re-bound to a new transport session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A six-character uppercase alphanumeric room identifier.
///
/// Room codes are what players type to find each other, so the alphabet is
/// restricted to `[A-Z0-9]` and the length is fixed at six.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    pub const LEN: usize = 6;

    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Generates a uniformly random room code.
    pub fn generate<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        let code: String = (0..Self::LEN)
            .map(|_| {
                let idx = rng.random_range(0..Self::ALPHABET.len());
                Self::ALPHABET[idx] as char
            })
            .collect();
        Self(code)
    }

    /// Parses and validates a candidate room code.
    pub fn parse(s: &str) -> Result<Self, crate::ProtocolError> {
        crate::validate_room_code(s)?;
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for one transport connection.
///
/// A player who reconnects gets a *new* session id; replay-protection seq
/// counters reset with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Top-level wrapper for every inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Client protocol version, `MAJOR.MINOR.PATCH`. Only MAJOR is checked.
    pub version: String,
    /// Per-session monotonically non-decreasing sequence number.
    pub seq: u64,
    /// The event payload.
    pub payload: ClientEvent,
}

/// How a room expects its clients to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Lan,
    P2p,
}

/// Chat message flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Text,
    Emote,
    System,
}

/// Why a client is asking for a full snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncReason {
    Desync,
    Reconnect,
    Manual,
}

/// Every event a client can send, with its payload schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    CreateGame {
        game_type: String,
        mode: GameMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_players: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_players: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    JoinGame {
        room_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// `ready` omitted means "toggle".
    #[serde(rename_all = "camelCase")]
    PlayerReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ready: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    StartGame {
        #[serde(default)]
        force_start: bool,
    },
    #[serde(rename_all = "camelCase")]
    SubmitMove {
        #[serde(rename = "type")]
        kind: String,
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    UndoMove {
        #[serde(default = "default_true")]
        confirm: bool,
    },
    #[serde(rename_all = "camelCase")]
    LeaveGame {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        message: String,
        #[serde(rename = "type")]
        kind: ChatKind,
    },
    #[serde(rename_all = "camelCase")]
    Ping { client_time: u64 },
    #[serde(rename_all = "camelCase")]
    RequestSync { reason: SyncReason },
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Top-level wrapper for every outbound message.
///
/// `version` is the room's authoritative state version at emit time, `tick`
/// the scheduler tick, `server_time` milliseconds since the host started.
/// For one session, envelopes are delivered in increasing `tick` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEnvelope {
    pub version: u64,
    pub tick: u64,
    pub server_time: u64,
    pub payload: ServerEvent,
}

/// One entry in an ordered state delta.
///
/// Paths are dotted/indexed JSON paths rooted at the game state document,
/// e.g. `board.2.0` or `players.p1.balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DeltaOp {
    Set { path: String, value: Value },
    Delete { path: String },
    Push { path: String, value: Value },
    #[serde(rename_all = "camelCase")]
    Splice {
        path: String,
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    },
}

impl DeltaOp {
    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. }
            | Self::Delete { path }
            | Self::Push { path, .. }
            | Self::Splice { path, .. } => path,
        }
    }
}

/// Lobby roster entry inside `roomStateUpdate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub display_name: String,
    pub is_ready: bool,
    pub is_host: bool,
}

/// Coarse room status shown in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Ready,
    Playing,
    Paused,
    Ended,
}

/// Every event the server can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Ordered list of changes since the last emit (delta mode).
    #[serde(rename_all = "camelCase")]
    GameStateUpdate { ops: Vec<DeltaOp> },
    /// Full authoritative state (snapshot mode). `checksum` is the SHA-256
    /// of the canonical JSON so clients can detect desync.
    #[serde(rename_all = "camelCase")]
    GameStateSnapshot {
        state: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checksum: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RoomStateUpdate {
        room_code: RoomCode,
        game_type: String,
        status: RoomStatus,
        players: Vec<LobbyPlayer>,
        min_players: usize,
        max_players: usize,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        from: PlayerId,
        message: String,
        #[serde(rename = "type")]
        kind: ChatKind,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
        retryable: bool,
    },
    #[serde(rename_all = "camelCase")]
    Pong { client_time: u64, server_time: u64 },
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Error codes surfaced to clients. The string forms are part of the wire
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    RoomNotJoinable,
    InvalidTransition,
    NotYourTurn,
    InvalidMove,
    InsufficientBalance,
    UnknownCommand,
    CommandTimeout,
    UndoForbidden,
    ReplayRejected,
    ValidationError,
    RateLimit,
    RoomTerminated,
}

impl ErrorCode {
    /// Whether the client may reasonably retry the same request.
    pub fn retryable(self) -> bool {
        matches!(
            self,
            Self::CommandTimeout | Self::RateLimit | Self::ReplayRejected
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::RoomFull => "ROOM_FULL",
            Self::RoomNotJoinable => "ROOM_NOT_JOINABLE",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::InvalidMove => "INVALID_MOVE",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::UnknownCommand => "UNKNOWN_COMMAND",
            Self::CommandTimeout => "COMMAND_TIMEOUT",
            Self::UndoForbidden => "UNDO_FORBIDDEN",
            Self::ReplayRejected => "REPLAY_REJECTED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::RateLimit => "RATE_LIMIT",
            Self::RoomTerminated => "ROOM_TERMINATED",
        };
        f.write_str(s)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire contract pins exact JSON shapes; these tests verify the
    //! serde attributes produce them, since a mismatch breaks client SDKs.

    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::new("p-1")).unwrap();
        assert_eq!(json, "\"p-1\"");
    }

    #[test]
    fn test_room_code_generate_is_six_uppercase_alnum() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), 6);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_room_code_parse_rejects_lowercase() {
        assert!(RoomCode::parse("abc123").is_err());
        assert!(RoomCode::parse("ABC12").is_err());
        assert!(RoomCode::parse("ABC123").is_ok());
    }

    #[test]
    fn test_client_event_create_game_json_shape() {
        let evt = ClientEvent::CreateGame {
            game_type: "checkers".into(),
            mode: GameMode::Lan,
            room_code: None,
            min_players: Some(2),
            max_players: Some(2),
            options: None,
        };
        let v = serde_json::to_value(&evt).unwrap();
        assert_eq!(v["event"], "createGame");
        assert_eq!(v["data"]["gameType"], "checkers");
        assert_eq!(v["data"]["mode"], "lan");
        assert_eq!(v["data"]["minPlayers"], 2);
        assert!(v["data"].get("roomCode").is_none());
    }

    #[test]
    fn test_client_event_submit_move_uses_type_key() {
        let evt = ClientEvent::SubmitMove {
            kind: "placeMark".into(),
            data: json!({"row": 0, "col": 2}),
            timestamp: None,
        };
        let v = serde_json::to_value(&evt).unwrap();
        assert_eq!(v["event"], "submitMove");
        assert_eq!(v["data"]["type"], "placeMark");
        assert_eq!(v["data"]["data"]["col"], 2);
    }

    #[test]
    fn test_undo_move_confirm_defaults_true() {
        let evt: ClientEvent =
            serde_json::from_value(json!({"event": "undoMove", "data": {}}))
                .unwrap();
        assert_eq!(evt, ClientEvent::UndoMove { confirm: true });
    }

    #[test]
    fn test_player_ready_omitted_flag_means_toggle() {
        let evt: ClientEvent = serde_json::from_value(
            json!({"event": "playerReady", "data": {}}),
        )
        .unwrap();
        assert_eq!(evt, ClientEvent::PlayerReady { ready: None });
    }

    #[test]
    fn test_client_envelope_round_trip() {
        let env = ClientEnvelope {
            version: "1.0.0".into(),
            seq: 12,
            payload: ClientEvent::Ping { client_time: 99 },
        };
        let bytes = serde_json::to_vec(&env).unwrap();
        let decoded: ClientEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(env, decoded);
    }

    #[test]
    fn test_delta_op_set_json_shape() {
        let op = DeltaOp::Set {
            path: "board.0.0".into(),
            value: json!("X"),
        };
        let v = serde_json::to_value(&op).unwrap();
        assert_eq!(v["op"], "set");
        assert_eq!(v["path"], "board.0.0");
        assert_eq!(v["value"], "X");
    }

    #[test]
    fn test_delta_op_splice_json_shape() {
        let op = DeltaOp::Splice {
            path: "discards".into(),
            start: 1,
            delete_count: 2,
            items: vec![json!(5)],
        };
        let v = serde_json::to_value(&op).unwrap();
        assert_eq!(v["op"], "splice");
        assert_eq!(v["deleteCount"], 2);
    }

    #[test]
    fn test_error_code_screaming_snake_on_wire() {
        let v = serde_json::to_value(ErrorCode::RoomNotJoinable).unwrap();
        assert_eq!(v, "ROOM_NOT_JOINABLE");
        let back: ErrorCode =
            serde_json::from_value(json!("UNDO_FORBIDDEN")).unwrap();
        assert_eq!(back, ErrorCode::UndoForbidden);
    }

    #[test]
    fn test_error_code_retryable_set() {
        assert!(ErrorCode::CommandTimeout.retryable());
        assert!(ErrorCode::RateLimit.retryable());
        assert!(!ErrorCode::RoomFull.retryable());
        assert!(!ErrorCode::InvalidMove.retryable());
    }

    #[test]
    fn test_server_event_room_state_update_shape() {
        let evt = ServerEvent::RoomStateUpdate {
            room_code: RoomCode::parse("AB12CD").unwrap(),
            game_type: "blackjack".into(),
            status: RoomStatus::Waiting,
            players: vec![LobbyPlayer {
                id: PlayerId::new("p1"),
                display_name: "Ada".into(),
                is_ready: false,
                is_host: true,
            }],
            min_players: 2,
            max_players: 8,
        };
        let v = serde_json::to_value(&evt).unwrap();
        assert_eq!(v["event"], "roomStateUpdate");
        assert_eq!(v["data"]["status"], "waiting");
        assert_eq!(v["data"]["players"][0]["isHost"], true);
        assert_eq!(v["data"]["players"][0]["displayName"], "Ada");
    }

    #[test]
    fn test_server_envelope_carries_version_tick_time() {
        let env = ServerEnvelope {
            version: 4,
            tick: 120,
            server_time: 6000,
            payload: ServerEvent::Pong {
                client_time: 1,
                server_time: 6000,
            },
        };
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["version"], 4);
        assert_eq!(v["tick"], 120);
        assert_eq!(v["serverTime"], 6000);
        assert_eq!(v["payload"]["event"], "pong");
    }

    #[test]
    fn test_decode_unknown_event_returns_error() {
        let unknown = json!({"event": "flyToMoon", "data": {}});
        let result: Result<ClientEvent, _> = serde_json::from_value(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let result: Result<ClientEnvelope, _> =
            serde_json::from_slice(b"not json at all");
        assert!(result.is_err());
    }
}
