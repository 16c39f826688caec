//! Integration tests for the shared tick scheduler.
//!
//! Uses `tokio::time::pause()` (via `start_paused`) so the clock task's
//! sleeps auto-advance and every test is deterministic.

use std::time::Duration;

use parlor_tick::{SchedulerHandle, TickConfig, TickEvent, TickScheduler};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn spawn_20hz() -> SchedulerHandle {
    TickScheduler::spawn(TickConfig::with_rate(20))
}

async fn next_event(
    rx: &mut parlor_tick::TickReceiver,
) -> Option<TickEvent> {
    timeout(Duration::from_secs(2), rx.recv()).await.ok()?
}

#[tokio::test(start_paused = true)]
async fn test_ticks_fire_and_increment_monotonically() {
    let handle = spawn_20hz();
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.register_room("ROOM01", tx);

    let mut last_tick = 0u64;
    let mut seen = 0;
    while seen < 5 {
        match next_event(&mut rx).await.expect("scheduler stalled") {
            TickEvent::Tick { tick, dt } => {
                assert!(tick > last_tick, "tick numbers must increase");
                assert_eq!(dt, Duration::from_millis(50), "dt is fixed");
                last_tick = tick;
                seen += 1;
            }
            TickEvent::Snapshot { .. } => {}
        }
    }

    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_events_interleave_at_snapshot_rate() {
    // 20 Hz ticks, 10 Hz snapshots: one snapshot per two ticks.
    let handle = TickScheduler::spawn(TickConfig {
        tick_rate_hz: 20,
        snapshot_rate_hz: 10,
        ..Default::default()
    });
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.register_room("ROOM01", tx);

    let mut ticks = 0u32;
    let mut snapshots = 0u32;
    while snapshots < 3 {
        match next_event(&mut rx).await.expect("scheduler stalled") {
            TickEvent::Tick { .. } => ticks += 1,
            TickEvent::Snapshot { .. } => snapshots += 1,
        }
    }
    assert!(
        (4..=8).contains(&ticks),
        "expected roughly two ticks per snapshot, got {ticks}"
    );

    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_pause_halts_ticks_and_resume_continues_without_jump() {
    let handle = spawn_20hz();
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.register_room("ROOM01", tx);

    // Let a couple of ticks through.
    let mut last = 0u64;
    for _ in 0..2 {
        if let Some(TickEvent::Tick { tick, .. }) = next_event(&mut rx).await {
            last = tick;
        }
    }
    assert!(last >= 1);

    handle.pause();
    assert!(handle.is_paused());
    // Drain anything emitted before the pause landed.
    while let Ok(Some(_)) = timeout(Duration::from_millis(200), rx.recv()).await {}
    let paused_tick = handle.current_tick();

    // No ticks while paused.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.current_tick(), paused_tick);

    handle.resume();
    let resumed = loop {
        match next_event(&mut rx).await.expect("no tick after resume") {
            TickEvent::Tick { tick, .. } => break tick,
            TickEvent::Snapshot { .. } => {}
        }
    };
    // Paused wall time must not be replayed as a burst of ticks.
    assert!(
        resumed <= paused_tick + 2,
        "resume jumped from {paused_tick} to {resumed}"
    );

    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_unregistered_room_stops_receiving() {
    let handle = spawn_20hz();
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.register_room("ROOM01", tx);

    assert!(next_event(&mut rx).await.is_some());
    handle.unregister_room("ROOM01");
    while let Ok(Some(_)) = timeout(Duration::from_millis(200), rx.recv()).await {}

    let quiet = timeout(Duration::from_secs(2), rx.recv()).await;
    assert!(quiet.is_err(), "unregistered room still received events");

    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_dead_channel_is_collected_without_stalling_others() {
    let handle = spawn_20hz();

    let (dead_tx, dead_rx) = mpsc::unbounded_channel();
    drop(dead_rx);
    handle.register_room("DEAD01", dead_tx);

    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.register_room("ALIVE1", tx);

    // The live room keeps ticking.
    for _ in 0..3 {
        assert!(next_event(&mut rx).await.is_some());
    }
    // The dead room's channel was dropped from the registry.
    assert_eq!(handle.room_count(), 1);

    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_telemetry_counts_ticks() {
    let handle = spawn_20hz();
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.register_room("ROOM01", tx);

    for _ in 0..4 {
        next_event(&mut rx).await.expect("scheduler stalled");
    }

    let t = handle.telemetry();
    assert!(t.current_tick >= 1);
    assert!(t.samples >= 1);

    handle.shutdown();
}
