//! The Parlor room runtime.
//!
//! Rooms are single-writer actors: each runs in its own Tokio task, owns
//! its game state exclusively, and processes commands and ticks strictly
//! in order. Across rooms everything runs in parallel; the only shared
//! structure is the [`RoomRegistry`].
//!
//! Layers inside this crate, leaves first:
//!
//! - [`fsm`] — table-driven room and player state machines.
//! - [`player`] — the per-room roster.
//! - [`state`] — the versioned authoritative state container.
//! - [`game`] — the [`GameDef`]/[`Strategy`] contract game crates implement.
//! - [`bus`] — serialized command dispatch with the undo journal.
//! - [`sync`] — delta/snapshot synchronization with checksums.
//! - [`room`] — the actor tying it all together.
//! - [`registry`] — process-wide room index and lifecycle.

mod bus;
mod config;
mod error;
mod fsm;
mod game;
mod player;
mod registry;
mod room;
mod state;
mod sync;

pub use bus::{CommandBus, UndoEntry};
pub use config::RoomConfig;
pub use error::RoomError;
pub use fsm::{
    FsmState, HistoryEntry, PlayerState, RoomState, StateMachine, Transition,
};
pub use game::{
    CommandContext, CommandDescriptor, GameDef, GameError, Outcome,
    RosterEntry, SetupContext, Strategy, derive_seed,
};
pub use player::{Player, PlayerManager};
pub use registry::{CreateParams, RoomRegistry};
pub use room::{RoomHandle, RoomInfo, SubscriberSender};
pub use state::{
    FIELD_CURRENT_PLAYER, FIELD_IS_COMPLETE, FIELD_PHASE, FIELD_PLAYER_ORDER,
    GameState, PHASE_LOBBY,
};
pub use sync::{StateSynchronizer, apply_delta, checksum, diff};
