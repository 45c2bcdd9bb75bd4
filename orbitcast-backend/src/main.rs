use orbitcast_backend::config::Config;
use orbitcast_backend::iss::{ConnectionRegistry, IssApiClient, PositionBroadcaster};
use orbitcast_backend::{logging, server};

use anyhow::Result;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load("config.toml")?;

    // Initialize logging
    let _logging_guard = logging::init_logging("logs", "orbitcast-backend", &config.log_level)?;

    tracing::info!("Orbitcast backend starting...");
    tracing::info!("Loaded configuration: {:?}", config);

    // Wire the position feed: upstream client -> broadcast loop -> registry
    let api_client = IssApiClient::new(config.request_timeout())?;
    let broadcaster = PositionBroadcaster::new(Arc::new(api_client), config.update_interval());
    let registry = Arc::new(ConnectionRegistry::new(broadcaster));

    server::run(config, registry).await
}
