//! Session types: the host's record of one connection.

use std::time::Instant;

use parlor_protocol::{PlayerId, SessionId};

use crate::ReplayGuard;

/// The lifecycle state of a session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected
/// ```
///
/// There is no reconnect edge: a returning player gets a brand-new session
/// (and a fresh sequence window), the old one is discarded.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Actively connected.
    Connected,
    /// Connection dropped at the given instant. Kept around briefly so the
    /// room layer can read disconnect timestamps.
    Disconnected { since: Instant },
}

/// One connection's session record.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub player_id: PlayerId,
    pub state: SessionState,
    pub connected_at: Instant,
    /// Replay protection for this session's inbound envelopes.
    pub replay: ReplayGuard,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }
}
