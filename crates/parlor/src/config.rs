//! Environment-sourced host configuration.
//!
//! Every knob has a default matching the documented host contract;
//! unparseable or out-of-range values are clamped with a warning rather
//! than aborting startup.

use std::env;
use std::time::Duration;

use parlor_room::RoomConfig;
use parlor_tick::TickConfig;
use tracing::warn;

/// Host-wide configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Listen address (`PARLOR_BIND`).
    pub bind_addr: String,
    /// Tick rate in Hz (`TICK_RATE`, 20–60).
    pub tick_rate: u32,
    /// Snapshot cadence in Hz (`SNAPSHOT_RATE`).
    pub snapshot_rate: u32,
    /// Hard cap on players per room (`MAX_PLAYERS_PER_ROOM`).
    pub max_players_per_room: usize,
    /// Hard cap on concurrent rooms (`MAX_ROOMS`).
    pub max_rooms: usize,
    /// Idle-lobby collection timeout (`ROOM_IDLE_TIMEOUT_MS`).
    pub room_idle_timeout_ms: u64,
    /// Replay-protection window (`MAX_SEQUENCE_DRIFT`).
    pub max_sequence_drift: u64,
    /// Seed game RNGs from `(room code, creation time)` (`DETERMINISTIC_RNG`).
    pub deterministic_rng: bool,
    /// Strategy execution budget (`COMMAND_TIMEOUT_MS`).
    pub command_timeout_ms: u64,
    /// Undo journal depth (`UNDO_JOURNAL_SIZE`).
    pub undo_journal_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            tick_rate: 30,
            snapshot_rate: 10,
            max_players_per_room: 8,
            max_rooms: 100,
            room_idle_timeout_ms: 1_800_000,
            max_sequence_drift: 100,
            deterministic_rng: true,
            command_timeout_ms: 5,
            undo_journal_size: 64,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, "unparseable value — using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

impl HostConfig {
    /// Reads configuration from the environment, clamping out-of-range
    /// values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env::var("PARLOR_BIND").unwrap_or(defaults.bind_addr),
            tick_rate: parse_var("TICK_RATE", defaults.tick_rate),
            snapshot_rate: parse_var("SNAPSHOT_RATE", defaults.snapshot_rate),
            max_players_per_room: parse_var(
                "MAX_PLAYERS_PER_ROOM",
                defaults.max_players_per_room,
            ),
            max_rooms: parse_var("MAX_ROOMS", defaults.max_rooms),
            room_idle_timeout_ms: parse_var(
                "ROOM_IDLE_TIMEOUT_MS",
                defaults.room_idle_timeout_ms,
            ),
            max_sequence_drift: parse_var(
                "MAX_SEQUENCE_DRIFT",
                defaults.max_sequence_drift,
            ),
            deterministic_rng: parse_bool(
                "DETERMINISTIC_RNG",
                defaults.deterministic_rng,
            ),
            command_timeout_ms: parse_var(
                "COMMAND_TIMEOUT_MS",
                defaults.command_timeout_ms,
            ),
            undo_journal_size: parse_var(
                "UNDO_JOURNAL_SIZE",
                defaults.undo_journal_size,
            ),
        }
        .validated()
    }

    /// Clamps out-of-range values (same rules the tick layer applies).
    pub fn validated(mut self) -> Self {
        if !(TickConfig::MIN_TICK_RATE_HZ..=TickConfig::MAX_TICK_RATE_HZ)
            .contains(&self.tick_rate)
        {
            warn!(rate = self.tick_rate, "TICK_RATE out of 20..=60 — clamping");
            self.tick_rate = self
                .tick_rate
                .clamp(TickConfig::MIN_TICK_RATE_HZ, TickConfig::MAX_TICK_RATE_HZ);
        }
        if self.max_players_per_room == 0 {
            warn!("MAX_PLAYERS_PER_ROOM must be positive — using 1");
            self.max_players_per_room = 1;
        }
        if self.max_rooms == 0 {
            warn!("MAX_ROOMS must be positive — using 1");
            self.max_rooms = 1;
        }
        self
    }

    /// The scheduler configuration this host runs with.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            tick_rate_hz: self.tick_rate,
            snapshot_rate_hz: self.snapshot_rate,
            ..TickConfig::default()
        }
    }

    /// The per-room defaults derived from host configuration.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            max_players: self.max_players_per_room,
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            undo_journal_size: self.undo_journal_size,
            room_idle_timeout: Duration::from_millis(self.room_idle_timeout_ms),
            deterministic_rng: self.deterministic_rng,
            ..RoomConfig::default()
        }
    }
}
