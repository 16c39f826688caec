//! Players and the per-room roster.
//!
//! A room references players by their stable [`PlayerId`]; removing a
//! player from the roster never destroys the player's global identity.
//! The roster preserves join order, which drives `playerOrder` and host
//! promotion.

use std::time::Instant;

use parlor_protocol::{PlayerId, SessionId};
use serde_json::Value;

use crate::{PlayerState, RoomError, StateMachine};

/// One room member.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    /// Current transport binding; `None` while disconnected.
    pub session: Option<SessionId>,
    pub ready: bool,
    pub fsm: StateMachine<PlayerState>,
    /// Per-game metadata (assigned color, seat, balance, ...), written by
    /// strategies through the state document and mirrored here as needed.
    pub meta: Value,
    pub connection_attempts: u32,
    pub joined_at: Instant,
    pub last_activity: Instant,
    pub last_disconnect: Option<Instant>,
}

impl Player {
    pub fn new(id: PlayerId, display_name: String, session: SessionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            display_name,
            session: Some(session),
            ready: false,
            fsm: StateMachine::new(PlayerState::Connecting),
            meta: Value::Null,
            connection_attempts: 1,
            joined_at: now,
            last_activity: now,
            last_disconnect: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
            && !matches!(
                self.fsm.current(),
                PlayerState::Disconnected | PlayerState::Left
            )
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// The room's roster, in join order.
#[derive(Debug, Default)]
pub struct PlayerManager {
    players: Vec<Player>,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly connected player and walks their FSM into the lobby.
    pub fn add(&mut self, mut player: Player) -> Result<(), RoomError> {
        if self.contains(&player.id) {
            return Err(RoomError::Validation(format!(
                "player {} already in the room",
                player.id
            )));
        }
        player.fsm.transition(PlayerState::Connected)?;
        player.fsm.transition(PlayerState::Joining)?;
        player.fsm.transition(PlayerState::InLobby)?;
        self.players.push(player);
        Ok(())
    }

    /// Removes a player, transitioning them to `Left`.
    pub fn remove(&mut self, id: &PlayerId) -> Result<Player, RoomError> {
        let idx = self
            .players
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| RoomError::NotInRoom(id.clone()))?;
        let mut player = self.players.remove(idx);
        // Left is reachable from every non-terminal player state.
        let _ = player.fsm.transition(PlayerState::Left);
        Ok(player)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.iter().any(|p| &p.id == id)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    /// Sets or toggles readiness. Drives the `InLobby ↔ Ready` edge.
    pub fn set_ready(
        &mut self,
        id: &PlayerId,
        ready: Option<bool>,
    ) -> Result<bool, RoomError> {
        let player = self
            .get_mut(id)
            .ok_or_else(|| RoomError::NotInRoom(id.clone()))?;
        let target = ready.unwrap_or(!player.ready);
        if target != player.ready {
            let state = if target {
                PlayerState::Ready
            } else {
                PlayerState::InLobby
            };
            player.fsm.transition(state)?;
            player.ready = target;
        }
        player.touch();
        Ok(target)
    }

    /// Marks a player's transport as gone.
    pub fn mark_disconnected(&mut self, id: &PlayerId) -> Result<(), RoomError> {
        let player = self
            .get_mut(id)
            .ok_or_else(|| RoomError::NotInRoom(id.clone()))?;
        player.fsm.transition(PlayerState::Disconnected)?;
        player.session = None;
        player.ready = false;
        player.last_disconnect = Some(Instant::now());
        Ok(())
    }

    /// Re-binds a disconnected player to a new transport session.
    pub fn rebind(
        &mut self,
        id: &PlayerId,
        session: SessionId,
        back_to: PlayerState,
    ) -> Result<(), RoomError> {
        let player = self
            .get_mut(id)
            .ok_or_else(|| RoomError::NotInRoom(id.clone()))?;
        player.fsm.transition(back_to)?;
        player.session = Some(session);
        player.connection_attempts += 1;
        player.touch();
        Ok(())
    }

    /// The longest-connected player still present — the host-promotion rule.
    pub fn longest_connected(&self) -> Option<&Player> {
        self.players
            .iter()
            .filter(|p| p.fsm.current() != PlayerState::Left)
            .min_by_key(|p| p.joined_at)
    }

    /// True when every member is ready. Empty rosters are never "all ready".
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.ready)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Player ids in join order.
    pub fn order(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }
}
