//! The room actor: an isolated Tokio task owning one game instance.
//!
//! Each room runs in its own task and is a single-writer actor: at most one
//! command application or tick callback executes for a given room at any
//! instant. The outside world talks to it through [`RoomHandle`] over an
//! mpsc channel; the tick scheduler feeds it [`TickEvent`]s over a second
//! channel. A panicking game is confined to its own room — the actor
//! catches it, tears the room down, and notifies subscribers.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use tokio::time::Instant as TokioInstant;

use parlor_protocol::{
    ChatKind, ErrorCode, LobbyPlayer, PlayerId, RoomCode, RoomStatus,
    ServerEnvelope, ServerEvent, SessionId,
};
use parlor_tick::{TickEvent, TickReceiver};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    CommandBus, CommandDescriptor, GameDef, GameState, PlayerManager,
    PlayerState, Player, RoomConfig, RoomError, RoomState, RosterEntry,
    SetupContext, StateMachine, StateSynchronizer,
};

/// Channel on which a subscriber receives outbound envelopes.
pub type SubscriberSender = mpsc::UnboundedSender<ServerEnvelope>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        display_name: String,
        session: SessionId,
        sender: SubscriberSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        reason: Option<String>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    SetReady {
        player_id: PlayerId,
        ready: Option<bool>,
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },
    Start {
        player_id: PlayerId,
        force: bool,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Submit {
        descriptor: CommandDescriptor,
        reply: oneshot::Sender<Result<u64, RoomError>>,
    },
    Undo {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<u64, RoomError>>,
    },
    Chat {
        from: PlayerId,
        message: String,
        kind: ChatKind,
    },
    RequestSync {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Disconnected {
        player_id: PlayerId,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Destroy,
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub game_id: String,
    pub state: RoomState,
    pub host: PlayerId,
    pub player_count: usize,
    pub min_players: usize,
    pub max_players: usize,
    /// Current state version, once a game is attached.
    pub version: Option<u64>,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Whether the actor has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    pub async fn join(
        &self,
        player_id: PlayerId,
        display_name: String,
        session: SessionId,
        sender: SubscriberSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            display_name,
            session,
            sender,
            reply,
        })
        .await?
    }

    pub async fn leave(
        &self,
        player_id: PlayerId,
        reason: Option<String>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave {
            player_id,
            reason,
            reply,
        })
        .await?
    }

    pub async fn set_ready(
        &self,
        player_id: PlayerId,
        ready: Option<bool>,
    ) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::SetReady {
            player_id,
            ready,
            reply,
        })
        .await?
    }

    pub async fn start(
        &self,
        player_id: PlayerId,
        force: bool,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start {
            player_id,
            force,
            reply,
        })
        .await?
    }

    /// Submits a command; resolves to the new state version.
    pub async fn submit(
        &self,
        descriptor: CommandDescriptor,
    ) -> Result<u64, RoomError> {
        self.request(|reply| RoomCommand::Submit { descriptor, reply })
            .await?
    }

    pub async fn undo_last(&self, player_id: PlayerId) -> Result<u64, RoomError> {
        self.request(|reply| RoomCommand::Undo { player_id, reply })
            .await?
    }

    pub async fn chat(
        &self,
        from: PlayerId,
        message: String,
        kind: ChatKind,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Chat {
                from,
                message,
                kind,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    pub async fn request_sync(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RequestSync { player_id, reply })
            .await?
    }

    /// Notifies the room that a player's transport dropped.
    pub async fn disconnected(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Disconnected { player_id })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    pub async fn destroy(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Destroy)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

enum Flow {
    Continue,
    Stop,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    game_id: String,
    host: PlayerId,
    config: RoomConfig,
    options: Option<Value>,
    seed: u64,
    fsm: StateMachine<RoomState>,
    players: PlayerManager,
    game_def: Arc<dyn GameDef>,
    game: Option<GameState>,
    bus: CommandBus,
    sync: StateSynchronizer,
    subscribers: HashMap<PlayerId, SubscriberSender>,
    rx: mpsc::Receiver<RoomCommand>,
    tick_rx: TickReceiver,
    current_tick: u64,
    last_command_at: TokioInstant,
}

impl RoomActor {
    async fn run(mut self) {
        info!(room = %self.code, game = %self.game_id, "room actor started");

        // Creation walks straight into the lobby.
        if let Err(e) = self.fsm.transition(RoomState::Lobby) {
            warn!(room = %self.code, error = %e, "room failed to open");
            return;
        }

        let mut tick_closed = false;
        loop {
            tokio::select! {
                maybe_cmd = self.rx.recv() => {
                    let Some(cmd) = maybe_cmd else { break };
                    if matches!(self.handle(cmd), Flow::Stop) {
                        break;
                    }
                }
                maybe_tick = self.tick_rx.recv(), if !tick_closed => {
                    match maybe_tick {
                        Some(event) => {
                            if matches!(self.on_tick(event), Flow::Stop) {
                                break;
                            }
                        }
                        None => tick_closed = true,
                    }
                }
            }
        }

        info!(room = %self.code, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::Join {
                player_id,
                display_name,
                session,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, display_name, session, sender);
                let _ = reply.send(result);
                Flow::Continue
            }
            RoomCommand::Leave {
                player_id,
                reason,
                reply,
            } => {
                let (result, flow) = self.handle_leave(player_id, reason);
                let _ = reply.send(result);
                flow
            }
            RoomCommand::SetReady {
                player_id,
                ready,
                reply,
            } => {
                let result = self.players.set_ready(&player_id, ready);
                if result.is_ok() {
                    self.broadcast_room_state();
                }
                let _ = reply.send(result);
                Flow::Continue
            }
            RoomCommand::Start {
                player_id,
                force,
                reply,
            } => {
                let _ = reply.send(self.handle_start(player_id, force));
                Flow::Continue
            }
            RoomCommand::Submit { descriptor, reply } => {
                let (result, flow) = self.handle_submit(descriptor);
                let _ = reply.send(result);
                flow
            }
            RoomCommand::Undo { player_id, reply } => {
                let _ = reply.send(self.handle_undo(player_id));
                Flow::Continue
            }
            RoomCommand::Chat {
                from,
                message,
                kind,
            } => {
                if self.players.contains(&from) {
                    let event = ServerEvent::ChatMessage {
                        from,
                        message,
                        kind,
                    };
                    self.broadcast(event);
                }
                Flow::Continue
            }
            RoomCommand::RequestSync { player_id, reply } => {
                let _ = reply.send(self.handle_request_sync(player_id));
                Flow::Continue
            }
            RoomCommand::Disconnected { player_id } => {
                self.handle_disconnected(player_id);
                Flow::Continue
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
                Flow::Continue
            }
            RoomCommand::Destroy => {
                info!(room = %self.code, "room destroyed by request");
                self.terminate();
                Flow::Stop
            }
        }
    }

    // -- membership --------------------------------------------------------

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        display_name: String,
        session: SessionId,
        sender: SubscriberSender,
    ) -> Result<(), RoomError> {
        if self.players.contains(&player_id) {
            return self.handle_rejoin(player_id, session, sender);
        }

        if !self.fsm.current().is_joinable() {
            return Err(RoomError::NotJoinable(self.code.clone()));
        }
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        self.players
            .add(Player::new(player_id.clone(), display_name, session))?;
        self.subscribers.insert(player_id.clone(), sender);
        info!(
            room = %self.code,
            player = %player_id,
            players = self.players.len(),
            "player joined"
        );
        self.broadcast_room_state();
        Ok(())
    }

    /// A known player id reappearing with a new transport handle.
    fn handle_rejoin(
        &mut self,
        player_id: PlayerId,
        session: SessionId,
        sender: SubscriberSender,
    ) -> Result<(), RoomError> {
        let in_game = self.game.is_some()
            && matches!(self.fsm.current(), RoomState::Playing | RoomState::Paused);
        let back_to = if in_game {
            PlayerState::Playing
        } else {
            PlayerState::InLobby
        };
        self.players.rebind(&player_id, session, back_to)?;
        self.subscribers.insert(player_id.clone(), sender);
        info!(room = %self.code, player = %player_id, "player rejoined");

        // Resume once every seat is connected again.
        if self.fsm.current() == RoomState::Paused
            && self.players.iter().all(Player::is_connected)
        {
            if self.fsm.transition(RoomState::Playing).is_ok() {
                info!(room = %self.code, "game resumed");
            }
        }

        if let Some(state) = &self.game {
            let env = self.sync.snapshot(state, self.current_tick);
            self.send_to(&player_id, env);
        }
        self.broadcast_room_state();
        Ok(())
    }

    fn handle_leave(
        &mut self,
        player_id: PlayerId,
        reason: Option<String>,
    ) -> (Result<(), RoomError>, Flow) {
        if let Err(e) = self.players.remove(&player_id) {
            return (Err(e), Flow::Continue);
        }
        self.subscribers.remove(&player_id);
        info!(
            room = %self.code,
            player = %player_id,
            reason = reason.as_deref().unwrap_or("none"),
            players = self.players.len(),
            "player left"
        );

        if self.players.is_empty() {
            info!(room = %self.code, "last player left — ending room");
            self.terminate();
            return (Ok(()), Flow::Stop);
        }

        if player_id == self.host {
            if let Some(next_host) = self.players.longest_connected() {
                self.host = next_host.id.clone();
                info!(room = %self.code, host = %self.host, "host promoted");
            }
        }
        self.broadcast_room_state();
        (Ok(()), Flow::Continue)
    }

    fn handle_disconnected(&mut self, player_id: PlayerId) {
        if self.players.mark_disconnected(&player_id).is_ok() {
            self.subscribers.remove(&player_id);
            debug!(room = %self.code, player = %player_id, "player disconnected");

            // Losing a seated player mid-game pauses the room until they
            // rejoin.
            if self.game.is_some() && self.fsm.current() == RoomState::Playing {
                if self.fsm.transition(RoomState::Paused).is_ok() {
                    info!(room = %self.code, "game paused — player disconnected");
                }
            }
            self.broadcast_room_state();
        }
    }

    // -- game lifecycle ----------------------------------------------------

    fn handle_start(&mut self, player_id: PlayerId, force: bool) -> Result<(), RoomError> {
        if !self.players.contains(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }
        if self.fsm.current() != RoomState::Lobby {
            return Err(RoomError::InvalidTransition {
                from: self.fsm.current().to_string(),
                to: RoomState::Starting.to_string(),
            });
        }
        if self.players.len() < self.config.min_players {
            return Err(RoomError::Rejected {
                code: ErrorCode::ValidationError,
                message: format!(
                    "need at least {} players",
                    self.config.min_players
                ),
            });
        }
        let forced = force && player_id == self.host;
        if !self.players.all_ready() && !forced {
            return Err(RoomError::Rejected {
                code: ErrorCode::ValidationError,
                message: "not all players are ready".into(),
            });
        }

        self.fsm.transition(RoomState::Starting)?;
        let setup = SetupContext {
            roster: self.roster(),
            seed: self.seed,
            options: self.options.clone(),
        };
        let doc = match self.game_def.initial_state(&setup) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(room = %self.code, error = %e, "game factory failed");
                self.fsm.transition(RoomState::Lobby)?;
                return Err(e.into());
            }
        };

        self.game = Some(GameState::new(doc));
        self.bus.clear_journal();
        self.sync.reset();

        // Walk every member into the playing state; a forced start pushes
        // unready players through Ready first.
        for player in self.players.iter_mut() {
            match player.fsm.current() {
                PlayerState::Ready => {
                    player.fsm.transition(PlayerState::Playing)?;
                }
                PlayerState::InLobby => {
                    player.fsm.transition(PlayerState::Ready)?;
                    player.fsm.transition(PlayerState::Playing)?;
                }
                _ => {}
            }
        }

        self.fsm.transition(RoomState::Playing)?;
        info!(
            room = %self.code,
            players = self.players.len(),
            forced,
            "game started"
        );

        if let Some(state) = &self.game {
            let env = self.sync.snapshot(state, self.current_tick);
            self.broadcast_envelope(env);
        }
        self.broadcast_room_state();
        Ok(())
    }

    fn handle_submit(
        &mut self,
        descriptor: CommandDescriptor,
    ) -> (Result<u64, RoomError>, Flow) {
        if self.game.is_none() || !self.fsm.current().is_active() {
            return (
                Err(RoomError::Rejected {
                    code: ErrorCode::ValidationError,
                    message: "no active game".into(),
                }),
                Flow::Continue,
            );
        }

        let player = descriptor.player_id.clone();
        let roster = self.roster();
        let def = Arc::clone(&self.game_def);
        let state = self.game.as_mut().expect("checked above");
        let bus = &mut self.bus;

        // A panic in a strategy or mid-apply is a bug in the game, not the
        // host; it terminates this room and nothing else.
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            bus.submit(def.as_ref(), state, &roster, descriptor)
        }));

        match result {
            Ok(Ok(version)) => {
                self.last_command_at = TokioInstant::now();
                if let Some(pid) = &player {
                    if let Some(p) = self.players.get_mut(pid) {
                        p.touch();
                    }
                }
                self.sync.mark_dirty();
                let flow = self.after_command();
                (Ok(version), flow)
            }
            Ok(Err(e)) => (Err(e), Flow::Continue),
            Err(_) => {
                warn!(room = %self.code, "game panicked — terminating room");
                self.room_fatal();
                (Err(RoomError::Unavailable(self.code.clone())), Flow::Stop)
            }
        }
    }

    /// Reacts to state the last command left behind: round completion and
    /// post-game vote resolutions.
    fn after_command(&mut self) -> Flow {
        let Some(state) = &self.game else {
            return Flow::Continue;
        };

        if state.is_complete() && self.fsm.current() == RoomState::Playing {
            if self.fsm.transition(RoomState::RoundEnd).is_ok() {
                debug!(room = %self.code, "round complete");
                self.broadcast_room_state();
            }
            return Flow::Continue;
        }

        if self.fsm.current() == RoomState::RoundEnd {
            if state.wants_lobby() {
                self.return_to_lobby();
            } else if !state.is_complete() {
                // The vote strategy rebuilt the state for a fresh round.
                if self.fsm.transition(RoomState::Starting).is_ok()
                    && self.fsm.transition(RoomState::Playing).is_ok()
                {
                    self.bus.clear_journal();
                    if let Some(state) = &self.game {
                        let env = self.sync.snapshot(state, self.current_tick);
                        self.broadcast_envelope(env);
                    }
                    self.broadcast_room_state();
                }
            }
        }
        Flow::Continue
    }

    fn return_to_lobby(&mut self) {
        if self.fsm.transition(RoomState::Lobby).is_err() {
            return;
        }
        self.game = None;
        self.bus.clear_journal();
        self.sync.reset();
        for player in self.players.iter_mut() {
            player.ready = false;
            if player.fsm.current() == PlayerState::Playing {
                let _ = player.fsm.transition(PlayerState::InLobby);
            }
        }
        info!(room = %self.code, "returned to lobby");
        self.broadcast_room_state();
    }

    fn handle_undo(&mut self, player_id: PlayerId) -> Result<u64, RoomError> {
        let state = self
            .game
            .as_mut()
            .ok_or(RoomError::UndoForbidden)?;
        let version = self.bus.undo_last(state, &player_id)?;
        self.last_command_at = TokioInstant::now();
        self.sync.mark_dirty();
        Ok(version)
    }

    fn handle_request_sync(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if !self.players.contains(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }
        match &self.game {
            Some(state) => {
                let env = self.sync.snapshot(state, self.current_tick);
                self.send_to(&player_id, env);
            }
            None => {
                let env = self.room_state_envelope();
                self.send_to(&player_id, env);
            }
        }
        Ok(())
    }

    // -- ticks -------------------------------------------------------------

    fn on_tick(&mut self, event: TickEvent) -> Flow {
        match event {
            TickEvent::Tick { tick, .. } => {
                self.current_tick = tick;

                if self.fsm.current() == RoomState::Lobby
                    && self.last_command_at.elapsed() >= self.config.room_idle_timeout
                {
                    info!(room = %self.code, "idle timeout — collecting room");
                    self.terminate();
                    return Flow::Stop;
                }

                if matches!(
                    self.fsm.current(),
                    RoomState::Playing | RoomState::Paused
                ) {
                    if let Some(state) = &self.game {
                        if let Some(env) = self.sync.delta(state, tick) {
                            self.broadcast_envelope(env);
                        }
                    }
                }
            }
            TickEvent::Snapshot { tick } => {
                self.current_tick = self.current_tick.max(tick);
                if self.fsm.current().is_active() {
                    if let Some(state) = &self.game {
                        let env = self.sync.snapshot(state, tick);
                        self.broadcast_envelope(env);
                    }
                }
            }
        }
        Flow::Continue
    }

    // -- teardown ----------------------------------------------------------

    /// Walks the FSM to `Terminated` (via `Ending` where the table allows)
    /// and detaches every subscriber.
    fn terminate(&mut self) {
        if self.fsm.can_transition(RoomState::Ending) {
            let _ = self.fsm.transition(RoomState::Ending);
        }
        if self.fsm.can_transition(RoomState::Terminated) {
            let _ = self.fsm.transition(RoomState::Terminated);
        }
        self.broadcast_room_state();
        self.subscribers.clear();
        self.game = None;
    }

    /// Room-fatal path: a bug inside the game. Subscribers are told before
    /// the room goes away.
    fn room_fatal(&mut self) {
        self.broadcast(ServerEvent::Error {
            code: ErrorCode::RoomTerminated,
            message: "room terminated due to an internal game error".into(),
            details: None,
            retryable: false,
        });
        self.terminate();
    }

    // -- plumbing ----------------------------------------------------------

    fn roster(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|p| RosterEntry {
                id: p.id.clone(),
                display_name: p.display_name.clone(),
                connected: p.is_connected(),
            })
            .collect()
    }

    fn status(&self) -> RoomStatus {
        match self.fsm.current() {
            RoomState::Initializing => RoomStatus::Waiting,
            RoomState::Lobby => {
                if self.players.len() >= self.config.min_players
                    && self.players.all_ready()
                {
                    RoomStatus::Ready
                } else {
                    RoomStatus::Waiting
                }
            }
            RoomState::Starting | RoomState::Playing | RoomState::RoundEnd => {
                RoomStatus::Playing
            }
            RoomState::Paused => RoomStatus::Paused,
            RoomState::Ending | RoomState::Terminated => RoomStatus::Ended,
        }
    }

    fn room_state_envelope(&self) -> ServerEnvelope {
        let players = self
            .players
            .iter()
            .map(|p| LobbyPlayer {
                id: p.id.clone(),
                display_name: p.display_name.clone(),
                is_ready: p.ready,
                is_host: p.id == self.host,
            })
            .collect();
        self.envelope(ServerEvent::RoomStateUpdate {
            room_code: self.code.clone(),
            game_type: self.game_id.clone(),
            status: self.status(),
            players,
            min_players: self.config.min_players,
            max_players: self.config.max_players,
        })
    }

    fn envelope(&self, payload: ServerEvent) -> ServerEnvelope {
        ServerEnvelope {
            version: self.game.as_ref().map(GameState::version).unwrap_or(0),
            tick: self.current_tick,
            server_time: self.sync.server_time(),
            payload,
        }
    }

    fn broadcast_room_state(&self) {
        let env = self.room_state_envelope();
        self.broadcast_envelope(env);
    }

    fn broadcast(&self, payload: ServerEvent) {
        let env = self.envelope(payload);
        self.broadcast_envelope(env);
    }

    fn broadcast_envelope(&self, env: ServerEnvelope) {
        for sender in self.subscribers.values() {
            let _ = sender.send(env.clone());
        }
    }

    /// Sends to one player; silently drops if their channel is gone.
    fn send_to(&self, player_id: &PlayerId, env: ServerEnvelope) {
        if let Some(sender) = self.subscribers.get(player_id) {
            let _ = sender.send(env);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            game_id: self.game_id.clone(),
            state: self.fsm.current(),
            host: self.host.clone(),
            player_count: self.players.len(),
            min_players: self.config.min_players,
            max_players: self.config.max_players,
            version: self.game.as_ref().map(GameState::version),
        }
    }
}

/// Arguments for spawning a room actor.
pub(crate) struct SpawnRoom {
    pub code: RoomCode,
    pub host: PlayerId,
    pub game_def: Arc<dyn GameDef>,
    pub config: RoomConfig,
    pub options: Option<Value>,
    pub seed: u64,
    pub epoch: Instant,
    pub tick_rx: TickReceiver,
}

/// Command channel depth per room; senders wait when it fills.
const ROOM_CHANNEL_SIZE: usize = 64;

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(args: SpawnRoom) -> RoomHandle {
    let (tx, rx) = mpsc::channel(ROOM_CHANNEL_SIZE);

    let game_id = args.game_def.game_id().to_string();
    let actor = RoomActor {
        code: args.code.clone(),
        game_id,
        host: args.host,
        bus: CommandBus::new(
            args.config.command_timeout,
            args.config.undo_journal_size,
        ),
        sync: StateSynchronizer::new(args.epoch),
        config: args.config,
        options: args.options,
        seed: args.seed,
        fsm: StateMachine::new(RoomState::Initializing),
        players: PlayerManager::new(),
        game_def: args.game_def,
        game: None,
        subscribers: HashMap::new(),
        rx,
        tick_rx: args.tick_rx,
        current_tick: 0,
        last_command_at: TokioInstant::now(),
    };

    tokio::spawn(actor.run());

    RoomHandle {
        code: args.code,
        sender: tx,
    }
}
