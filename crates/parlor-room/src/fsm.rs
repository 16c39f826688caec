//! Table-driven finite state machines for rooms and players.
//!
//! Both machines share one rule: a transition not present in the legal
//! table fails with `InvalidTransition` and leaves the state untouched.
//! Every machine keeps a bounded history of `(state, timestamp)` entries
//! for diagnostics.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use crate::RoomError;

/// How many transitions each machine remembers.
const HISTORY_LIMIT: usize = 32;

/// A state usable in a [`StateMachine`]: it knows its own legal successors.
pub trait FsmState: Copy + Eq + fmt::Debug + fmt::Display + 'static {
    /// The set of states this state may legally transition to.
    fn legal_targets(self) -> &'static [Self];

    /// Terminal states have no successors.
    fn is_terminal(self) -> bool {
        self.legal_targets().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Room lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Initializing,
    Lobby,
    Starting,
    Playing,
    Paused,
    RoundEnd,
    Ending,
    Terminated,
}

impl FsmState for RoomState {
    fn legal_targets(self) -> &'static [Self] {
        use RoomState::*;
        match self {
            Initializing => &[Lobby, Terminated],
            Lobby => &[Starting, Terminated],
            Starting => &[Playing, Lobby, Terminated],
            Playing => &[Paused, RoundEnd, Ending, Terminated],
            Paused => &[Playing, Ending, Terminated],
            RoundEnd => &[Starting, Lobby, Ending, Terminated],
            Ending => &[Terminated],
            Terminated => &[],
        }
    }
}

impl RoomState {
    /// Whether new players may join in this state.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby | Self::Paused)
    }

    /// Whether a game is in flight (deltas may be emitted).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::RoundEnd)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "INITIALIZING",
            Self::Lobby => "LOBBY",
            Self::Starting => "STARTING",
            Self::Playing => "PLAYING",
            Self::Paused => "PAUSED",
            Self::RoundEnd => "ROUND_END",
            Self::Ending => "ENDING",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Player membership
// ---------------------------------------------------------------------------

/// Membership/activity state of a player within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Connecting,
    Connected,
    Joining,
    InLobby,
    Ready,
    Playing,
    Spectating,
    Disconnected,
    Left,
}

impl FsmState for PlayerState {
    fn legal_targets(self) -> &'static [Self] {
        use PlayerState::*;
        match self {
            Connecting => &[Connected, Disconnected, Left],
            Connected => &[Joining, Disconnected, Left],
            Joining => &[InLobby, Connected, Disconnected, Left],
            InLobby => &[Ready, Spectating, Connected, Disconnected, Left],
            Ready => &[InLobby, Playing, Disconnected, Left],
            Playing => &[InLobby, Spectating, Disconnected, Left],
            Spectating => &[InLobby, Disconnected, Left],
            Disconnected => &[Connected, InLobby, Playing, Left],
            Left => &[],
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Joining => "JOINING",
            Self::InLobby => "IN_LOBBY",
            Self::Ready => "READY",
            Self::Playing => "PLAYING",
            Self::Spectating => "SPECTATING",
            Self::Disconnected => "DISCONNECTED",
            Self::Left => "LEFT",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// One recorded step of a machine's life.
#[derive(Debug, Clone)]
pub struct HistoryEntry<S> {
    pub state: S,
    pub at: Instant,
}

/// A completed transition, returned so the owner can react to it
/// (re-broadcast lobby state, detach a finished game, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
}

/// Generic table-driven state machine with bounded history.
#[derive(Debug)]
pub struct StateMachine<S: FsmState> {
    current: S,
    history: VecDeque<HistoryEntry<S>>,
}

impl<S: FsmState> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        let mut history = VecDeque::new();
        history.push_back(HistoryEntry {
            state: initial,
            at: Instant::now(),
        });
        Self {
            current: initial,
            history,
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    /// Attempts a transition. Illegal moves fail and change nothing.
    pub fn transition(&mut self, to: S) -> Result<Transition<S>, RoomError> {
        let from = self.current;
        if !from.legal_targets().contains(&to) {
            return Err(RoomError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.current = to;
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            state: to,
            at: Instant::now(),
        });
        Ok(Transition { from, to })
    }

    /// Whether `to` would be accepted from the current state.
    pub fn can_transition(&self, to: S) -> bool {
        self.current.legal_targets().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// The recorded history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry<S>> {
        self.history.iter()
    }
}
