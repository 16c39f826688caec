//! The versioned authoritative state container.
//!
//! The state document is an opaque JSON tree shaped by the active game.
//! The container enforces what the core needs regardless of shape: a
//! version that bumps by exactly one per replacement, no aliasing between
//! versions (replacement swaps the whole tree), and typed access to the
//! well-known header fields the sync layer reads.

use parlor_protocol::PlayerId;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::GameError;

/// Well-known field: current phase of the game.
pub const FIELD_PHASE: &str = "phase";
/// Well-known field: id of the player whose turn it is.
pub const FIELD_CURRENT_PLAYER: &str = "currentPlayerId";
/// Well-known field: seat order.
pub const FIELD_PLAYER_ORDER: &str = "playerOrder";
/// Well-known field: whether the game has concluded.
pub const FIELD_IS_COMPLETE: &str = "isComplete";
/// Phase value strategies set when a post-game vote resolves to the lobby.
pub const PHASE_LOBBY: &str = "lobby";

/// Versioned, atomically replaceable game state.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    version: u64,
    doc: Value,
}

impl GameState {
    /// Wraps a freshly built state document at version 1.
    pub fn new(doc: Value) -> Self {
        Self { version: 1, doc }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn doc(&self) -> &Value {
        &self.doc
    }

    /// Replaces the document wholesale and bumps the version by one.
    ///
    /// The previous tree is returned so callers can journal it; nothing in
    /// the new version aliases it.
    pub fn replace(&mut self, doc: Value) -> Value {
        self.version += 1;
        std::mem::replace(&mut self.doc, doc)
    }

    /// Deserializes the document into a game's typed state.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, GameError> {
        serde_json::from_value(self.doc.clone()).map_err(GameError::State)
    }

    /// Serializes a typed state back into a document.
    pub fn encode<T: Serialize>(state: &T) -> Result<Value, GameError> {
        serde_json::to_value(state).map_err(GameError::State)
    }

    // -- well-known header fields ------------------------------------------

    pub fn phase(&self) -> Option<&str> {
        self.doc.get(FIELD_PHASE).and_then(Value::as_str)
    }

    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.doc
            .get(FIELD_CURRENT_PLAYER)
            .and_then(Value::as_str)
            .map(PlayerId::from)
    }

    pub fn player_order(&self) -> Vec<PlayerId> {
        self.doc
            .get(FIELD_PLAYER_ORDER)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(PlayerId::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_complete(&self) -> bool {
        self.doc
            .get(FIELD_IS_COMPLETE)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether a post-game vote has sent the room back to its lobby.
    pub fn wants_lobby(&self) -> bool {
        self.phase() == Some(PHASE_LOBBY)
    }
}
