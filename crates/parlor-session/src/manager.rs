//! The session manager: tracks every live connection.
//!
//! # Concurrency note
//!
//! `SessionManager` is not thread-safe by itself — it is owned by the
//! server's connection layer and accessed behind a single lock there.
//! Keeping it a plain `HashMap` avoids hidden locking overhead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parlor_protocol::{PlayerId, SessionId};
use tracing::info;

use crate::{ReplayGuard, Session, SessionError, SessionState};

/// Counter for generating unique session ids.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-player connection statistics the room layer consults.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// How many times this player has connected (including reconnects).
    pub attempts: u32,
    /// When the player's most recent session dropped, if ever.
    pub last_disconnect: Option<Instant>,
}

/// Manages all sessions and the player → current-session index.
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    /// A player has at most one current session.
    by_player: HashMap<PlayerId, SessionId>,
    stats: HashMap<PlayerId, ConnectionStats>,
    max_drift: u64,
}

impl SessionManager {
    pub fn new(max_drift: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            by_player: HashMap::new(),
            stats: HashMap::new(),
            max_drift,
        }
    }

    /// Creates a session for a player, superseding any previous one.
    ///
    /// The fresh [`SessionId`] is what permits the client to restart its
    /// sequence counter after a reconnect.
    pub fn create(&mut self, player_id: PlayerId) -> SessionId {
        if let Some(old) = self.by_player.remove(&player_id) {
            self.sessions.remove(&old);
            info!(player = %player_id, old_session = %old, "superseding stale session");
        }

        let id = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        let session = Session {
            id,
            player_id: player_id.clone(),
            state: SessionState::Connected,
            connected_at: Instant::now(),
            replay: ReplayGuard::new(self.max_drift),
        };
        self.sessions.insert(id, session);
        self.by_player.insert(player_id.clone(), id);
        self.stats.entry(player_id.clone()).or_default().attempts += 1;

        info!(player = %player_id, session = %id, "session created");
        id
    }

    /// Marks a session as disconnected and records the timestamp.
    pub fn disconnect(&mut self, id: SessionId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        let now = Instant::now();
        session.state = SessionState::Disconnected { since: now };
        self.stats
            .entry(session.player_id.clone())
            .or_default()
            .last_disconnect = Some(now);
        info!(player = %session.player_id, session = %id, "session disconnected");
        Ok(())
    }

    /// Removes a session entirely (connection handler finished).
    pub fn remove(&mut self, id: SessionId) {
        if let Some(session) = self.sessions.remove(&id) {
            // Only drop the player index if it still points at this session;
            // a reconnect may have already replaced it.
            if self.by_player.get(&session.player_id) == Some(&id) {
                self.by_player.remove(&session.player_id);
            }
        }
    }

    /// Runs an inbound seq through the session's replay guard.
    pub fn accept_seq(&mut self, id: SessionId, seq: u64) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        session.replay.accept(seq)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// The player's current session, if connected.
    pub fn session_for(&self, player_id: &PlayerId) -> Option<&Session> {
        self.by_player
            .get(player_id)
            .and_then(|id| self.sessions.get(id))
    }

    pub fn stats_for(&self, player_id: &PlayerId) -> Option<&ConnectionStats> {
        self.stats.get(player_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
