//! Dining Concierge chat server
//!
//! Entry point: loads configuration, installs tracing and serves the widget.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use concierge_chat::{config::AppConfig, server, telemetry};
use dotenvy::dotenv;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before reading config
    let _ = dotenv();

    telemetry::init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        name: "config.loaded",
        port = config.server.port,
        concierge = config.concierge.enabled,
        "Configuration loaded"
    );

    server::start_server(Arc::new(config)).await
}
