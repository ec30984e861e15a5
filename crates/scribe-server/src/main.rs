//! Scribe Server Binary
//!
//! Standalone server for the scribe project notes API.

use std::sync::Arc;

use scribe_core::ScribeConfig;
use scribe_server::{serve, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = ScribeConfig::from_env()?;
    tracing::debug!("Effective configuration: {}", config.to_json()?);
    let state = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };

    let addr = state.config.server.addr.clone();
    serve(&addr, state).await
}
