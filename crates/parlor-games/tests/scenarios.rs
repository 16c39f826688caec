//! End-to-end scenarios: real games driven through the room runtime.

use std::time::Duration;

use parlor_games::GameRegistry;
use parlor_protocol::{
    PlayerId, RoomCode, ServerEnvelope, ServerEvent, SessionId,
};
use parlor_room::{
    CommandDescriptor, CreateParams, RoomConfig, RoomHandle, RoomRegistry,
    RoomState, apply_delta, checksum,
};
use parlor_tick::{TickConfig, TickScheduler};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn pid(id: &str) -> PlayerId {
    PlayerId::new(id)
}

fn registry() -> (RoomRegistry, GameRegistry) {
    let scheduler = TickScheduler::spawn(TickConfig::with_rate(20));
    (
        RoomRegistry::new(scheduler, RoomConfig::default(), 100),
        GameRegistry::with_builtin_games(),
    )
}

async fn create_and_start(
    rooms: &RoomRegistry,
    games: &GameRegistry,
    game_id: &str,
    code: &str,
) -> (RoomHandle, mpsc::UnboundedReceiver<ServerEnvelope>) {
    let handle = rooms
        .create(CreateParams {
            host: pid("host"),
            game: games.get(game_id).expect("game registered"),
            requested_code: Some(RoomCode::parse(code).unwrap()),
            min_players: None,
            max_players: None,
            options: None,
        })
        .expect("create room");

    let (host_tx, host_rx) = mpsc::unbounded_channel();
    handle
        .join(pid("host"), "Host".into(), SessionId(1), host_tx)
        .await
        .unwrap();
    let (guest_tx, guest_rx) = mpsc::unbounded_channel();
    handle
        .join(pid("guest"), "Guest".into(), SessionId(2), guest_tx)
        .await
        .unwrap();
    drop(guest_rx);

    handle.set_ready(pid("host"), Some(true)).await.unwrap();
    handle.set_ready(pid("guest"), Some(true)).await.unwrap();
    handle.start(pid("host"), false).await.unwrap();
    (handle, host_rx)
}

async fn submit_move(room: &RoomHandle, player: &str, kind: &str, data: Value) -> u64 {
    room.submit(CommandDescriptor::new(kind, data, Some(pid(player))))
        .await
        .expect("command accepted")
}

/// Drains the subscriber channel until a fresh snapshot arrives, returning
/// its state document.
async fn latest_snapshot(
    room: &RoomHandle,
    rx: &mut mpsc::UnboundedReceiver<ServerEnvelope>,
    min_version: u64,
) -> Value {
    room.request_sync(pid("host")).await.unwrap();
    loop {
        let env = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        if env.version < min_version {
            continue;
        }
        if let ServerEvent::GameStateSnapshot { state, .. } = env.payload {
            return state;
        }
    }
}

// =========================================================================
// Tic-Tac-Toe
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_tictactoe_row_win_end_to_end() {
    let (rooms, games) = registry();
    let (room, mut rx) =
        create_and_start(&rooms, &games, "tictactoe", "ABC123").await;

    submit_move(&room, "host", "placeMark", json!({"row": 0, "col": 0})).await;
    submit_move(&room, "guest", "placeMark", json!({"row": 1, "col": 0})).await;
    submit_move(&room, "host", "placeMark", json!({"row": 0, "col": 1})).await;
    submit_move(&room, "guest", "placeMark", json!({"row": 1, "col": 1})).await;
    let v = submit_move(&room, "host", "placeMark", json!({"row": 0, "col": 2})).await;

    let state = latest_snapshot(&room, &mut rx, v).await;
    assert_eq!(state["isComplete"], true);
    assert_eq!(state["winner"], "host");
    assert_eq!(state["board"][0], json!(["X", "X", "X"]));

    // Round completion moves the room out of Playing.
    let info = room.info().await.unwrap();
    assert_eq!(info.state, RoomState::RoundEnd);
}

#[tokio::test(start_paused = true)]
async fn test_tictactoe_undo_restores_board_at_plus_two() {
    let (rooms, games) = registry();
    let (room, mut rx) =
        create_and_start(&rooms, &games, "tictactoe", "UNDO01").await;

    let v1 = submit_move(&room, "host", "placeMark", json!({"row": 0, "col": 0})).await;
    let v2 = room.undo_last(pid("host")).await.unwrap();
    assert_eq!(v2, v1 + 1, "undo is one version after the move");
    assert_eq!(v2, (v1 - 1) + 2, "net effect is +2 over the pre-move state");

    let state = latest_snapshot(&room, &mut rx, v2).await;
    assert_eq!(state["board"][0][0], Value::Null);
    assert_eq!(state["currentPlayerId"], "host", "host is to move again");
}

#[tokio::test(start_paused = true)]
async fn test_tictactoe_undo_by_non_originator_forbidden() {
    let (rooms, games) = registry();
    let (room, _rx) = create_and_start(&rooms, &games, "tictactoe", "UNDO02").await;

    submit_move(&room, "host", "placeMark", json!({"row": 2, "col": 2})).await;
    let err = room.undo_last(pid("guest")).await.unwrap_err();
    assert_eq!(err.code(), parlor_protocol::ErrorCode::UndoForbidden);
}

// =========================================================================
// Checkers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_checkers_forced_capture_end_to_end() {
    let (rooms, games) = registry();
    let (room, mut rx) =
        create_and_start(&rooms, &games, "checkers", "CHK001").await;

    submit_move(&room, "host", "movePiece", json!({"from": [5, 0], "path": [[4, 1]]})).await;
    submit_move(&room, "guest", "movePiece", json!({"from": [2, 3], "path": [[3, 2]]})).await;
    let v =
        submit_move(&room, "host", "movePiece", json!({"from": [4, 1], "path": [[2, 3]]})).await;

    let state = latest_snapshot(&room, &mut rx, v).await;
    assert_eq!(state["board"][3][2], Value::Null, "captured piece removed");
    assert_eq!(state["board"][2][3], "r");
    assert_eq!(state["currentPlayerId"], "guest");
    assert_eq!(state["players"]["host"]["color"], "red");
    assert_eq!(state["players"]["guest"]["color"], "black");
}

// =========================================================================
// Baccarat: vote flow returns the room to its lobby
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_baccarat_round_and_lobby_vote() {
    let (rooms, games) = registry();
    let (room, mut rx) =
        create_and_start(&rooms, &games, "baccarat", "BAC001").await;

    let v1 = submit_move(
        &room,
        "host",
        "placeBet",
        json!({"on": "player", "amount": 10}),
    )
    .await;
    let v2 = submit_move(
        &room,
        "guest",
        "placeBet",
        json!({"on": "banker", "amount": 10}),
    )
    .await;
    assert_eq!(v2, v1 + 1);

    let state = latest_snapshot(&room, &mut rx, v2).await;
    assert_eq!(state["phase"], "settled");
    assert!(state["outcome"].is_string());
    assert_eq!(room.info().await.unwrap().state, RoomState::RoundEnd);

    // Any lobby vote wins with two players.
    submit_move(&room, "host", "vote", json!({"choice": "newGame"})).await;
    submit_move(&room, "guest", "vote", json!({"choice": "lobby"})).await;

    let info = room.info().await.unwrap();
    assert_eq!(info.state, RoomState::Lobby);
    assert!(info.version.is_none(), "game detached on return to lobby");
}

// =========================================================================
// Snapshot + delta reconstruction
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_client_reconstruction_matches_server_state() {
    let (rooms, games) = registry();
    let (room, mut rx) =
        create_and_start(&rooms, &games, "tictactoe", "SYNC01").await;

    // The client doc starts from the first snapshot, then folds in every
    // delta and snapshot in arrival order.
    let mut client_doc: Option<Value> = None;

    let moves = [
        ("host", 0usize, 0usize),
        ("guest", 2, 2),
        ("host", 1, 1),
        ("guest", 2, 0),
    ];
    let mut last_version = 0;
    for (player, row, col) in moves {
        last_version =
            submit_move(&room, player, "placeMark", json!({"row": row, "col": col})).await;
        // Let ticks flush the deltas.
        tokio::time::sleep(Duration::from_millis(120)).await;
    }

    let mut final_checksum = None;
    room.request_sync(pid("host")).await.unwrap();
    while let Ok(Some(env)) = timeout(Duration::from_millis(300), rx.recv()).await {
        match env.payload {
            ServerEvent::GameStateSnapshot { state, checksum } => {
                if env.version == last_version {
                    final_checksum = checksum;
                }
                client_doc = Some(state);
            }
            ServerEvent::GameStateUpdate { ops } => {
                let doc = client_doc.as_mut().expect("delta before snapshot");
                apply_delta(doc, &ops).expect("delta applies");
            }
            _ => {}
        }
        if final_checksum.is_some() {
            break;
        }
    }

    let reconstructed = client_doc.expect("no state received");
    assert_eq!(reconstructed["board"][1][1], "X");
    assert_eq!(reconstructed["board"][2][0], "O");
    assert_eq!(
        Some(checksum(&reconstructed)),
        final_checksum,
        "client reconstruction must hash identically to the server state"
    );
}
