//! Transport session tracking for Parlor.
//!
//! A session is the host's record of one live connection: which player it
//! carries, when it connected, and which inbound sequence numbers it has
//! already accepted. Reconnecting players keep their [`PlayerId`] but get a
//! fresh [`SessionId`] — and with it a fresh sequence window, which is what
//! allows clients to restart their counters after a drop.

mod error;
mod manager;
mod replay;
mod session;

pub use error::SessionError;
pub use manager::{ConnectionStats, SessionManager};
pub use replay::ReplayGuard;
pub use session::{Session, SessionState};

pub use parlor_protocol::{PlayerId, SessionId};
