//! Per-room configuration.

use std::time::Duration;

/// Configuration for a room instance.
///
/// Player bounds may be narrowed per room at creation time (within the
/// game's own bounds); the rest comes from host configuration.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Minimum players required to start the game.
    pub min_players: usize,

    /// Maximum players allowed in the room.
    pub max_players: usize,

    /// Wall-clock budget for a single strategy execution.
    pub command_timeout: Duration,

    /// Maximum undo journal entries; the oldest are evicted.
    pub undo_journal_size: usize,

    /// A room sitting in the lobby with no command activity for this long
    /// is terminated and collected.
    pub room_idle_timeout: Duration,

    /// When set, game state factories receive a seed derived from the room
    /// code and creation time, making sessions replayable.
    pub deterministic_rng: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 8,
            command_timeout: Duration::from_millis(5),
            undo_journal_size: 64,
            room_idle_timeout: Duration::from_secs(30 * 60),
            deterministic_rng: true,
        }
    }
}
