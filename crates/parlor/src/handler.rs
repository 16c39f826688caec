//! Per-connection handler: identity, envelope validation, replay
//! protection, and event routing into the room runtime.
//!
//! Each accepted connection gets its own task. The flow is:
//!   1. Resolve the player's identity (the auth collaborator's job).
//!   2. Create a session (fresh sequence window).
//!   3. Spawn a writer task that pumps room broadcasts to the socket.
//!   4. Loop: decode envelope → validate → replay-check → route.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parlor_protocol::{
    ClientEnvelope, ClientEvent, Codec, ErrorCode, PlayerId, RoomCode,
    ServerEnvelope, ServerEvent, SessionId, validate_envelope,
};
use parlor_room::{CommandDescriptor, CreateParams, RoomError, RoomHandle};
use parlor_session::SessionError;
use parlor_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::ParlorError;
use crate::server::{Identity, ServerState};

/// Most `createGame` requests allowed per connection per window.
const CREATE_LIMIT: usize = 5;
const CREATE_WINDOW: Duration = Duration::from_secs(60);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<I: Identity>(
    conn: WebSocketConnection,
    state: Arc<ServerState<I>>,
) -> Result<(), ParlorError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();

    let (player_id, display_name) = state.identity.identify(conn_id).await?;
    let session_id = state.sessions.lock().await.create(player_id.clone());
    info!(%conn_id, player = %player_id, session = %session_id, "connection established");

    // Writer task: drains the outbound channel into the socket. Rooms
    // broadcast into this same channel via the subscriber sender.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerEnvelope>();
    let writer_conn = Arc::clone(&conn);
    let writer_codec = state.codec;
    let writer = tokio::spawn(async move {
        while let Some(env) = out_rx.recv().await {
            let Ok(bytes) = writer_codec.encode(&env) else { continue };
            if writer_conn.send(&bytes).await.is_err() {
                break;
            }
        }
    });

    let mut session = ConnSession {
        state: Arc::clone(&state),
        player_id: player_id.clone(),
        display_name,
        session_id,
        out_tx,
        room: None,
        create_times: Vec::new(),
    };

    loop {
        match conn.recv().await {
            Ok(Some(data)) => session.handle_message(&data).await,
            Ok(None) => {
                debug!(player = %player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                debug!(player = %player_id, error = %e, "recv error");
                break;
            }
        }
    }

    // Teardown: the room learns the transport dropped; the session keeps
    // its disconnect timestamp until removed.
    if let Some(room) = &session.room {
        let _ = room.disconnected(player_id.clone()).await;
    }
    {
        let mut sessions = state.sessions.lock().await;
        let _ = sessions.disconnect(session_id);
        sessions.remove(session_id);
    }
    writer.abort();
    Ok(())
}

/// Per-connection routing state.
struct ConnSession<I: Identity> {
    state: Arc<ServerState<I>>,
    player_id: PlayerId,
    display_name: String,
    session_id: SessionId,
    out_tx: mpsc::UnboundedSender<ServerEnvelope>,
    /// The room this connection is currently in, if any.
    room: Option<RoomHandle>,
    /// Recent `createGame` timestamps for rate limiting.
    create_times: Vec<Instant>,
}

impl<I: Identity> ConnSession<I> {
    async fn handle_message(&mut self, data: &[u8]) {
        let envelope: ClientEnvelope = match self.state.codec.decode(data) {
            Ok(env) => env,
            Err(e) => {
                debug!(player = %self.player_id, error = %e, "bad envelope");
                self.send_error(ErrorCode::ValidationError, &e.to_string());
                return;
            }
        };

        if let Err(e) = validate_envelope(&envelope) {
            self.send_error(ErrorCode::ValidationError, &e.to_string());
            return;
        }

        // Replay protection before anything touches a room.
        let accepted = self
            .state
            .sessions
            .lock()
            .await
            .accept_seq(self.session_id, envelope.seq);
        if let Err(e) = accepted {
            if matches!(e, SessionError::ReplayRejected { .. }) {
                self.send_error(ErrorCode::ReplayRejected, &e.to_string());
            }
            return;
        }

        self.route(envelope.payload).await;
    }

    async fn route(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::CreateGame {
                game_type,
                mode: _,
                room_code,
                min_players,
                max_players,
                options,
            } => {
                self.create_game(game_type, room_code, min_players, max_players, options)
                    .await;
            }

            ClientEvent::JoinGame { room_code, .. } => {
                let code = match RoomCode::parse(&room_code) {
                    Ok(code) => code,
                    Err(e) => {
                        self.send_error(ErrorCode::ValidationError, &e.to_string());
                        return;
                    }
                };
                match self.state.rooms.get(&code) {
                    Ok(handle) => self.join_room(handle).await,
                    Err(e) => self.send_room_error(e),
                }
            }

            ClientEvent::PlayerReady { ready } => {
                if let Some(room) = self.room.clone() {
                    if let Err(e) =
                        room.set_ready(self.player_id.clone(), ready).await
                    {
                        self.send_room_error(e);
                    }
                } else {
                    self.send_error(ErrorCode::RoomNotFound, "not in a room");
                }
            }

            ClientEvent::StartGame { force_start } => {
                if let Some(room) = self.room.clone() {
                    if let Err(e) =
                        room.start(self.player_id.clone(), force_start).await
                    {
                        self.send_room_error(e);
                    }
                } else {
                    self.send_error(ErrorCode::RoomNotFound, "not in a room");
                }
            }

            ClientEvent::SubmitMove { kind, data, .. } => {
                if let Some(room) = self.room.clone() {
                    let descriptor = CommandDescriptor::new(
                        kind,
                        data,
                        Some(self.player_id.clone()),
                    );
                    if let Err(e) = room.submit(descriptor).await {
                        self.send_room_error(e);
                    }
                } else {
                    self.send_error(ErrorCode::RoomNotFound, "not in a room");
                }
            }

            ClientEvent::UndoMove { confirm } => {
                if !confirm {
                    return;
                }
                if let Some(room) = self.room.clone() {
                    if let Err(e) = room.undo_last(self.player_id.clone()).await {
                        self.send_room_error(e);
                    }
                } else {
                    self.send_error(ErrorCode::RoomNotFound, "not in a room");
                }
            }

            ClientEvent::LeaveGame { reason } => {
                if let Some(room) = self.room.take() {
                    if let Err(e) =
                        room.leave(self.player_id.clone(), reason).await
                    {
                        self.send_room_error(e);
                    }
                }
            }

            ClientEvent::ChatMessage { message, kind } => {
                if let Some(room) = self.room.clone() {
                    let _ = room
                        .chat(self.player_id.clone(), message, kind)
                        .await;
                }
            }

            ClientEvent::Ping { client_time } => {
                let server_time = self.server_time();
                self.send(ServerEvent::Pong {
                    client_time,
                    server_time,
                });
            }

            ClientEvent::RequestSync { reason } => {
                debug!(player = %self.player_id, ?reason, "sync requested");
                if let Some(room) = self.room.clone() {
                    if let Err(e) = room.request_sync(self.player_id.clone()).await
                    {
                        self.send_room_error(e);
                    }
                } else {
                    self.send_error(ErrorCode::RoomNotFound, "not in a room");
                }
            }
        }
    }

    async fn create_game(
        &mut self,
        game_type: String,
        room_code: Option<String>,
        min_players: Option<usize>,
        max_players: Option<usize>,
        options: Option<serde_json::Value>,
    ) {
        let now = Instant::now();
        self.create_times
            .retain(|t| now.duration_since(*t) < CREATE_WINDOW);
        if self.create_times.len() >= CREATE_LIMIT {
            self.send_error(ErrorCode::RateLimit, "too many rooms created");
            return;
        }

        let Some(game) = self.state.games.get(&game_type) else {
            self.send_error(
                ErrorCode::ValidationError,
                &format!("unknown game type {game_type:?}"),
            );
            return;
        };

        let requested_code = match room_code.as_deref().map(RoomCode::parse) {
            Some(Ok(code)) => Some(code),
            Some(Err(e)) => {
                self.send_error(ErrorCode::ValidationError, &e.to_string());
                return;
            }
            None => None,
        };

        let created = self.state.rooms.create(CreateParams {
            host: self.player_id.clone(),
            game,
            requested_code,
            min_players,
            max_players,
            options,
        });
        match created {
            Ok(handle) => {
                self.create_times.push(now);
                self.join_room(handle).await;
            }
            Err(e) => self.send_room_error(e),
        }
    }

    /// Joins the room and, if this connection was already in another one,
    /// leaves it first.
    async fn join_room(&mut self, handle: RoomHandle) {
        if let Some(previous) = self.room.take() {
            if previous.code() != handle.code() {
                let _ = previous
                    .leave(self.player_id.clone(), Some("joined another room".into()))
                    .await;
            }
        }
        let result = handle
            .join(
                self.player_id.clone(),
                self.display_name.clone(),
                self.session_id,
                self.out_tx.clone(),
            )
            .await;
        match result {
            Ok(()) => {
                info!(player = %self.player_id, room = %handle.code(), "joined room");
                self.room = Some(handle);
            }
            Err(e) => self.send_room_error(e),
        }
    }

    fn server_time(&self) -> u64 {
        self.state.epoch.elapsed().as_millis() as u64
    }

    fn send(&self, payload: ServerEvent) {
        let env = ServerEnvelope {
            version: 0,
            tick: self.state.scheduler.current_tick(),
            server_time: self.server_time(),
            payload,
        };
        let _ = self.out_tx.send(env);
    }

    fn send_error(&self, code: ErrorCode, message: &str) {
        self.send(ServerEvent::Error {
            code,
            message: message.to_string(),
            details: None,
            retryable: code.retryable(),
        });
    }

    fn send_room_error(&self, error: RoomError) {
        let code = error.code();
        self.send_error(code, &error.to_string());
    }
}
