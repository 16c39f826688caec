//! The process-wide room registry.
//!
//! The registry is the only structure shared across rooms, so it is the
//! only place in the runtime that takes a lock. It maps room codes to
//! actor handles; a room is reachable here iff its actor is alive and its
//! FSM has not reached `Terminated`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parlor_protocol::{PlayerId, RoomCode};
use parlor_tick::SchedulerHandle;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::room::{SpawnRoom, spawn_room};
use crate::{GameDef, RoomConfig, RoomError, RoomHandle, RoomState, derive_seed};

/// How many random codes to try before declaring the space exhausted.
const CODE_ATTEMPTS: usize = 32;

/// Parameters for creating a room.
pub struct CreateParams {
    pub host: PlayerId,
    pub game: Arc<dyn GameDef>,
    /// Explicit code request (private lobbies); must be free.
    pub requested_code: Option<RoomCode>,
    pub min_players: Option<usize>,
    pub max_players: Option<usize>,
    pub options: Option<Value>,
}

/// Process-wide index from room code to room actor.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomCode, RoomHandle>>,
    scheduler: SchedulerHandle,
    defaults: RoomConfig,
    max_rooms: usize,
    epoch: Instant,
}

impl RoomRegistry {
    pub fn new(
        scheduler: SchedulerHandle,
        defaults: RoomConfig,
        max_rooms: usize,
    ) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            scheduler,
            defaults,
            max_rooms,
            epoch: Instant::now(),
        }
    }

    /// The instant `server_time` is measured from.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Creates and registers a room, spawning its actor and wiring it to
    /// the tick scheduler.
    pub fn create(&self, params: CreateParams) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        rooms.retain(|code, handle| {
            let alive = !handle.is_closed();
            if !alive {
                self.scheduler.unregister_room(code.as_str());
            }
            alive
        });

        if rooms.len() >= self.max_rooms {
            return Err(RoomError::RoomLimit);
        }

        let code = match params.requested_code {
            Some(code) => {
                if rooms.contains_key(&code) {
                    return Err(RoomError::Validation(format!(
                        "room code {code} is taken"
                    )));
                }
                code
            }
            None => {
                let mut rng = StdRng::from_os_rng();
                let mut found = None;
                for _ in 0..CODE_ATTEMPTS {
                    let candidate = RoomCode::generate(&mut rng);
                    if !rooms.contains_key(&candidate) {
                        found = Some(candidate);
                        break;
                    }
                }
                found.ok_or(RoomError::CodeExhausted)?
            }
        };

        let game = params.game;
        let mut config = self.defaults.clone();
        config.min_players = params
            .min_players
            .unwrap_or(game.min_players())
            .max(game.min_players());
        config.max_players = params
            .max_players
            .unwrap_or(config.max_players)
            .min(game.max_players())
            .min(self.defaults.max_players);
        if config.max_players < config.min_players {
            return Err(RoomError::Validation(format!(
                "maxPlayers {} < minPlayers {}",
                config.max_players, config.min_players
            )));
        }

        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let seed = if config.deterministic_rng {
            derive_seed(code.as_str(), created_at_ms)
        } else {
            rand::random()
        };

        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        self.scheduler.register_room(code.as_str(), tick_tx);

        let handle = spawn_room(SpawnRoom {
            code: code.clone(),
            host: params.host,
            game_def: game,
            config,
            options: params.options,
            seed,
            epoch: self.epoch,
            tick_rx,
        });

        info!(room = %code, "room registered");
        rooms.insert(code, handle.clone());
        Ok(handle)
    }

    /// Looks up a live room by code.
    pub fn get(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        let rooms = self.rooms.lock().expect("registry lock poisoned");
        match rooms.get(code) {
            Some(handle) if !handle.is_closed() => Ok(handle.clone()),
            _ => Err(RoomError::NotFound(code.clone())),
        }
    }

    /// Destroys a room: tells the actor to stop and removes the index entry.
    pub async fn destroy(&self, code: &RoomCode) -> Result<(), RoomError> {
        let handle = {
            let mut rooms = self.rooms.lock().expect("registry lock poisoned");
            rooms.remove(code).ok_or(RoomError::NotFound(code.clone()))?
        };
        self.scheduler.unregister_room(code.as_str());
        // The actor may already be gone; that's fine.
        let _ = handle.destroy().await;
        info!(room = %code, "room removed from registry");
        Ok(())
    }

    /// Sweeps terminated and dead rooms out of the index. Returns how many
    /// entries were collected.
    pub async fn collect_terminated(&self) -> usize {
        let handles: Vec<(RoomCode, RoomHandle)> = {
            let rooms = self.rooms.lock().expect("registry lock poisoned");
            rooms
                .iter()
                .map(|(c, h)| (c.clone(), h.clone()))
                .collect()
        };

        let mut dead = Vec::new();
        for (code, handle) in handles {
            let gone = match handle.info().await {
                Ok(info) => info.state == RoomState::Terminated,
                Err(_) => true,
            };
            if gone {
                dead.push(code);
            }
        }

        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        for code in &dead {
            rooms.remove(code);
            self.scheduler.unregister_room(code.as_str());
            debug!(room = %code, "collected terminated room");
        }
        dead.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().expect("registry lock poisoned").len()
    }

    pub fn codes(&self) -> Vec<RoomCode> {
        self.rooms
            .lock()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}
