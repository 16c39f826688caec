//! The Parlor host binary: env-configured, WebSocket-fronted, all
//! built-in games registered.

use parlor::{GuestIdentity, HostConfig, ParlorError, ParlorServer};

#[tokio::main]
async fn main() -> Result<(), ParlorError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = HostConfig::from_env();
    tracing::info!(?config, "starting parlor host");

    let server = ParlorServer::<GuestIdentity>::builder()
        .config(config)
        .build(GuestIdentity::default())
        .await?;
    tracing::info!(addr = ?server.local_addr(), "listening");
    server.run().await
}
