//! # Parlor
//!
//! A server-authoritative, real-time host for turn-based parlor and
//! casino games. Clients connect over WebSocket, join six-character room
//! codes, and observe a single authoritative game state advanced at a
//! fixed tick rate.
//!
//! The layers, bottom up: `parlor-transport` (sockets) →
//! `parlor-protocol` (envelopes and validation) → `parlor-session`
//! (replay protection) → `parlor-room` (the room runtime) →
//! `parlor-games` (the shipped games). This crate ties them into a
//! runnable host.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use parlor::{GuestIdentity, HostConfig, ParlorServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), parlor::ParlorError> {
//!     tracing_subscriber::fmt()
//!         .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
//!         .init();
//!
//!     let server = ParlorServer::<GuestIdentity>::builder()
//!         .config(HostConfig::from_env())
//!         .build(GuestIdentity::default())
//!         .await?;
//!     server.run().await
//! }
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod handler;
mod server;

pub use config::HostConfig;
pub use error::ParlorError;
pub use server::{GuestIdentity, Identity, ParlorServer, ParlorServerBuilder};

pub use parlor_games::GameRegistry;
pub use parlor_protocol::{
    ClientEnvelope, ClientEvent, ErrorCode, PlayerId, RoomCode, ServerEnvelope,
    ServerEvent, PROTOCOL_VERSION,
};
pub use parlor_room::{GameDef, Outcome, RoomError, Strategy};
