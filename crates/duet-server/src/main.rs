//! duet relay binary.
//!
//! # Usage
//!
//! ```bash
//! # Single instance, in-memory presence
//! duet-server --bind 0.0.0.0:8080
//!
//! # Shared presence across instances (requires the `redis` feature)
//! REDIS_INSTANCE=cache:6379 REDIS_USERNAME=relay REDIS_PASSWORD=... REDIS_DB=0 \
//!     duet-server --store redis
//! ```

use clap::Parser;
use duet_server::{Config, Server, connect_store};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("duet relay starting");
    tracing::info!(store = ?config.store, "binding to {}", config.bind);

    let store = connect_store(&config).await?;
    let server = Server::bind(&config.bind, store).await?.with_keepalive(config.keepalive()?);

    tracing::info!("Server listening on {}", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested");
        })
        .await?;

    Ok(())
}
