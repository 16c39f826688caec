//! Fixed-timestep tick scheduler for Parlor.
//!
//! One scheduler drives every room in the process. Each wake-up measures the
//! real elapsed time, feeds a delta accumulator, and drains it in fixed
//! `tick_interval` steps; rooms therefore always observe the same fixed
//! `dt`, never the measured delta. The accumulator is clamped so a stalled
//! host skips ticks instead of spiralling.
//!
//! Rooms receive [`TickEvent`]s over their own unbounded channels. A dead or
//! lagging room can only lose its own events; it can never stall the clock
//! or other rooms.
//!
//! # Integration
//!
//! ```ignore
//! let handle = TickScheduler::spawn(TickConfig::default());
//! handle.register_room("AB12CD", room_tick_tx);
//! // ... the room actor selects on its tick receiver ...
//! handle.unregister_room("AB12CD");
//! ```

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz. Permitted 20–60.
    pub tick_rate_hz: u32,
    /// Snapshot cadence in Hz. Must not exceed the tick rate.
    pub snapshot_rate_hz: u32,
    /// Accumulator clamp in milliseconds. Excess accumulated time is
    /// discarded and counted as skipped ticks.
    pub max_accumulated_ms: u64,
    /// A wake-up that takes longer than this is counted as a slow tick.
    pub warning_threshold_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30,
            snapshot_rate_hz: 10,
            max_accumulated_ms: 100,
            warning_threshold_ms: 10,
        }
    }
}

impl TickConfig {
    /// Minimum supported tick rate.
    pub const MIN_TICK_RATE_HZ: u32 = 20;
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 60;

    /// Create a config for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::spawn`]. Rules:
    /// - `tick_rate_hz` clamped to 20..=60.
    /// - `snapshot_rate_hz` clamped to 1..=tick_rate_hz.
    /// - `max_accumulated_ms` at least one tick interval.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz < Self::MIN_TICK_RATE_HZ
            || self.tick_rate_hz > Self::MAX_TICK_RATE_HZ
        {
            warn!(
                rate = self.tick_rate_hz,
                "tick_rate_hz out of 20..=60 — clamping"
            );
            self.tick_rate_hz = self
                .tick_rate_hz
                .clamp(Self::MIN_TICK_RATE_HZ, Self::MAX_TICK_RATE_HZ);
        }
        if self.snapshot_rate_hz == 0 || self.snapshot_rate_hz > self.tick_rate_hz {
            warn!(
                rate = self.snapshot_rate_hz,
                "snapshot_rate_hz out of 1..=tick_rate — clamping"
            );
            self.snapshot_rate_hz = self.snapshot_rate_hz.clamp(1, self.tick_rate_hz);
        }
        let interval_ms = (1000 / self.tick_rate_hz) as u64;
        if self.max_accumulated_ms < interval_ms {
            self.max_accumulated_ms = interval_ms;
        }
        self
    }

    /// Duration of a single tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }

    /// Wall-time between snapshot events.
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.snapshot_rate_hz as f64)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events fanned out to every registered room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    /// One fixed simulation step. `dt` is always the configured tick
    /// interval, regardless of how late the scheduler woke.
    Tick { tick: u64, dt: Duration },
    /// Periodic cue to broadcast a full state snapshot.
    Snapshot { tick: u64 },
}

/// Channel on which a room receives [`TickEvent`]s.
pub type TickSender = mpsc::UnboundedSender<TickEvent>;
/// Receiving half handed to the room actor.
pub type TickReceiver = mpsc::UnboundedReceiver<TickEvent>;

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// How many wake durations the rolling window retains.
const TELEMETRY_WINDOW: usize = 1_000;

/// Point-in-time summary of scheduler health.
#[derive(Debug, Clone, PartialEq)]
pub struct TickTelemetry {
    /// Ticks emitted so far.
    pub current_tick: u64,
    /// Ticks dropped by the accumulator clamp.
    pub skipped_ticks: u64,
    /// Wake-ups that exceeded `warning_threshold_ms`.
    pub slow_ticks: u64,
    /// Samples currently in the rolling window.
    pub samples: usize,
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

#[derive(Default)]
struct DurationWindow {
    samples: VecDeque<Duration>,
}

impl DurationWindow {
    fn record(&mut self, d: Duration) {
        if self.samples.len() == TELEMETRY_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(d);
    }

    fn percentile(sorted: &[Duration], p: f64) -> Duration {
        if sorted.is_empty() {
            return Duration::ZERO;
        }
        let rank = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted[rank.min(sorted.len() - 1)]
    }

    fn summarize(&self) -> (Duration, Duration, Duration, Duration, Duration, Duration) {
        if self.samples.is_empty() {
            return (
                Duration::ZERO,
                Duration::ZERO,
                Duration::ZERO,
                Duration::ZERO,
                Duration::ZERO,
                Duration::ZERO,
            );
        }
        let mut sorted: Vec<Duration> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        let total: Duration = sorted.iter().sum();
        let avg = total / sorted.len() as u32;
        (
            sorted[0],
            avg,
            sorted[sorted.len() - 1],
            Self::percentile(&sorted, 0.50),
            Self::percentile(&sorted, 0.95),
            Self::percentile(&sorted, 0.99),
        )
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct Shared {
    rooms: HashMap<String, TickSender>,
    paused: bool,
    current_tick: u64,
    skipped_ticks: u64,
    slow_ticks: u64,
    window: DurationWindow,
}

/// Handle to the running scheduler task. Cheap to clone; dropping every
/// handle does not stop the clock — call [`SchedulerHandle::shutdown`].
#[derive(Clone)]
pub struct SchedulerHandle {
    config: TickConfig,
    shared: Arc<Mutex<Shared>>,
    task: Arc<tokio::task::JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Registers a room's tick channel. Takes effect at the next tick
    /// boundary. Re-registering a key replaces the previous sender.
    pub fn register_room(&self, room: impl Into<String>, sender: TickSender) {
        let room = room.into();
        debug!(%room, "room registered with scheduler");
        self.shared
            .lock()
            .expect("scheduler lock poisoned")
            .rooms
            .insert(room, sender);
    }

    /// Removes a room's tick channel. Safe to call for unknown rooms.
    pub fn unregister_room(&self, room: &str) {
        debug!(%room, "room unregistered from scheduler");
        self.shared
            .lock()
            .expect("scheduler lock poisoned")
            .rooms
            .remove(room);
    }

    /// Halts tick emission. The tick counter resumes exactly where it
    /// stopped; paused wall time is never accumulated.
    pub fn pause(&self) {
        let mut shared = self.shared.lock().expect("scheduler lock poisoned");
        if !shared.paused {
            shared.paused = true;
            debug!(tick = shared.current_tick, "scheduler paused");
        }
    }

    /// Resumes tick emission after [`pause`](Self::pause).
    pub fn resume(&self) {
        let mut shared = self.shared.lock().expect("scheduler lock poisoned");
        if shared.paused {
            shared.paused = false;
            debug!(tick = shared.current_tick, "scheduler resumed");
        }
    }

    /// Whether the scheduler is currently paused.
    pub fn is_paused(&self) -> bool {
        self.shared.lock().expect("scheduler lock poisoned").paused
    }

    /// The last emitted tick number.
    pub fn current_tick(&self) -> u64 {
        self.shared
            .lock()
            .expect("scheduler lock poisoned")
            .current_tick
    }

    /// Number of rooms currently registered.
    pub fn room_count(&self) -> usize {
        self.shared
            .lock()
            .expect("scheduler lock poisoned")
            .rooms
            .len()
    }

    /// The validated configuration the scheduler runs with.
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Computes a telemetry summary over the rolling duration window.
    pub fn telemetry(&self) -> TickTelemetry {
        let shared = self.shared.lock().expect("scheduler lock poisoned");
        let (min, avg, max, p50, p95, p99) = shared.window.summarize();
        TickTelemetry {
            current_tick: shared.current_tick,
            skipped_ticks: shared.skipped_ticks,
            slow_ticks: shared.slow_ticks,
            samples: shared.window.samples.len(),
            min,
            avg,
            max,
            p50,
            p95,
            p99,
        }
    }

    /// Stops the clock task. Registered rooms simply stop receiving events.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

/// The process-wide fixed-timestep clock.
pub struct TickScheduler;

impl TickScheduler {
    /// Validates the config, spawns the clock task, and returns a handle.
    pub fn spawn(config: TickConfig) -> SchedulerHandle {
        let config = config.validated();
        debug!(
            rate_hz = config.tick_rate_hz,
            snapshot_hz = config.snapshot_rate_hz,
            "tick scheduler starting"
        );

        let shared = Arc::new(Mutex::new(Shared {
            rooms: HashMap::new(),
            paused: false,
            current_tick: 0,
            skipped_ticks: 0,
            slow_ticks: 0,
            window: DurationWindow::default(),
        }));

        let task = tokio::spawn(run_clock(config.clone(), Arc::clone(&shared)));

        SchedulerHandle {
            config,
            shared,
            task: Arc::new(task),
        }
    }
}

async fn run_clock(config: TickConfig, shared: Arc<Mutex<Shared>>) {
    let tick_interval = config.tick_interval();
    let snapshot_interval = config.snapshot_interval();
    let max_accumulated = Duration::from_millis(config.max_accumulated_ms);
    let warning_threshold = Duration::from_millis(config.warning_threshold_ms);

    let mut last_wake = Instant::now();
    let mut accumulator = Duration::ZERO;
    let mut snapshot_elapsed = Duration::ZERO;

    loop {
        time::sleep(tick_interval).await;

        let now = Instant::now();
        let delta = now.saturating_duration_since(last_wake);
        last_wake = now;

        let wake_start = Instant::now();
        let mut dead_rooms: Vec<String> = Vec::new();
        {
            let mut shared = shared.lock().expect("scheduler lock poisoned");
            if shared.paused {
                // Paused wall time is discarded; resuming must not replay it.
                continue;
            }

            accumulator += delta;
            snapshot_elapsed += delta;

            if accumulator > max_accumulated {
                let excess = accumulator - max_accumulated;
                let skipped =
                    (excess.as_nanos() / tick_interval.as_nanos().max(1)) as u64;
                if skipped > 0 {
                    shared.skipped_ticks += skipped;
                    warn!(
                        skipped,
                        behind_ms = excess.as_millis() as u64,
                        "accumulator clamped — skipping ticks"
                    );
                }
                accumulator = max_accumulated;
            }

            while accumulator >= tick_interval {
                accumulator -= tick_interval;
                shared.current_tick += 1;
                let tick = shared.current_tick;
                trace!(tick, "tick");
                fan_out(
                    &shared.rooms,
                    TickEvent::Tick {
                        tick,
                        dt: tick_interval,
                    },
                    &mut dead_rooms,
                );
            }

            if snapshot_elapsed >= snapshot_interval {
                snapshot_elapsed -= snapshot_interval;
                let tick = shared.current_tick;
                fan_out(
                    &shared.rooms,
                    TickEvent::Snapshot { tick },
                    &mut dead_rooms,
                );
            }

            for room in &dead_rooms {
                shared.rooms.remove(room);
                debug!(%room, "dropping closed tick channel");
            }

            let wake_duration = wake_start.elapsed();
            shared.window.record(wake_duration);
            if wake_duration > warning_threshold {
                shared.slow_ticks += 1;
                warn!(
                    elapsed_ms = wake_duration.as_secs_f64() * 1000.0,
                    threshold_ms = config.warning_threshold_ms,
                    "slow scheduler wake"
                );
            }
        }
    }
}

fn fan_out(
    rooms: &HashMap<String, TickSender>,
    event: TickEvent,
    dead: &mut Vec<String>,
) {
    for (room, sender) in rooms {
        if sender.send(event.clone()).is_err() && !dead.contains(room) {
            dead.push(room.clone());
        }
    }
}
