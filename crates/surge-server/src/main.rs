//! # Surge Server
//!
//! Pusher-compatible realtime relay server.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! surge
//!
//! # Run with a config file at ./surge.toml
//! surge
//!
//! # Run with environment variables
//! SURGE_PORT=8080 SURGE_APP_KEY=my-key SURGE_APP_SECRET=my-secret surge
//! ```

mod config;
mod handlers;
mod metrics;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!(
        "Starting Surge server on {}:{} for app {}",
        config.host,
        config.port,
        config.app.id
    );

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
