//! `ParlorServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session → room
//! runtime → games. One scheduler drives every room; one registry indexes
//! them; each connection runs its own handler task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parlor_games::GameRegistry;
use parlor_protocol::{JsonCodec, PlayerId};
use parlor_room::RoomRegistry;
use parlor_session::SessionManager;
use parlor_tick::{SchedulerHandle, TickScheduler};
use parlor_transport::{ConnectionId, Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::handler::handle_connection;
use crate::{HostConfig, ParlorError};

/// How often the registry sweeps terminated rooms.
const COLLECT_INTERVAL_SECS: u64 = 30;

/// Resolves a connection to a stable player identity.
///
/// Authentication is an external collaborator (HTTP login, JWT cookies);
/// the host only needs the resulting opaque player id and display name.
/// A reconnecting player presents the same id and is re-bound to their
/// room seat.
pub trait Identity: Send + Sync + 'static {
    fn identify(
        &self,
        conn: ConnectionId,
    ) -> impl std::future::Future<Output = Result<(PlayerId, String), ParlorError>> + Send;
}

/// Default identity for anonymous LAN play: every connection becomes a
/// fresh numbered guest.
#[derive(Default)]
pub struct GuestIdentity {
    counter: AtomicU64,
}

impl Identity for GuestIdentity {
    fn identify(
        &self,
        _conn: ConnectionId,
    ) -> impl std::future::Future<Output = Result<(PlayerId, String), ParlorError>> + Send
    {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        async move { Ok((PlayerId::new(format!("guest-{n}")), format!("Guest {n}"))) }
    }
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<I: Identity> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: RoomRegistry,
    pub(crate) games: GameRegistry,
    pub(crate) scheduler: SchedulerHandle,
    pub(crate) codec: JsonCodec,
    pub(crate) identity: I,
    pub(crate) epoch: Instant,
}

/// Builder for configuring and starting a Parlor host.
///
/// # Example
///
/// ```rust,ignore
/// let server = ParlorServer::builder()
///     .config(HostConfig::from_env())
///     .build(GuestIdentity::default())
///     .await?;
/// server.run().await
/// ```
pub struct ParlorServerBuilder {
    config: HostConfig,
    games: Option<GameRegistry>,
}

impl ParlorServerBuilder {
    pub fn new() -> Self {
        Self {
            config: HostConfig::default(),
            games: None,
        }
    }

    /// Uses the given host configuration.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config.validated();
        self
    }

    /// Overrides the game catalog (defaults to the built-in games).
    pub fn games(mut self, games: GameRegistry) -> Self {
        self.games = Some(games);
        self
    }

    /// Binds the transport, starts the scheduler, and builds the server.
    pub async fn build<I: Identity>(
        self,
        identity: I,
    ) -> Result<ParlorServer<I>, ParlorError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let scheduler = TickScheduler::spawn(self.config.tick_config());
        let rooms = RoomRegistry::new(
            scheduler.clone(),
            self.config.room_config(),
            self.config.max_rooms,
        );
        let epoch = rooms.epoch();

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(
                self.config.max_sequence_drift,
            )),
            rooms,
            games: self
                .games
                .unwrap_or_else(GameRegistry::with_builtin_games),
            scheduler,
            codec: JsonCodec,
            identity,
            epoch,
        });

        Ok(ParlorServer { transport, state })
    }
}

impl Default for ParlorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Parlor host.
pub struct ParlorServer<I: Identity> {
    transport: WebSocketTransport,
    state: Arc<ServerState<I>>,
}

impl<I: Identity> ParlorServer<I> {
    pub fn builder() -> ParlorServerBuilder {
        ParlorServerBuilder::new()
    }

    /// The local address the host is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Also starts the registry sweeper that collects terminated rooms.
    pub async fn run(mut self) -> Result<(), ParlorError> {
        info!("parlor host running");

        let sweeper_state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(
                std::time::Duration::from_secs(COLLECT_INTERVAL_SECS),
            );
            loop {
                interval.tick().await;
                let collected = sweeper_state.rooms.collect_terminated().await;
                if collected > 0 {
                    info!(collected, "swept terminated rooms");
                }
            }
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }
    }
}
