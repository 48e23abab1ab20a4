//! # Chatroom Server
//!
//! Multi-room chat backend with persisted history and real-time delivery.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Storage backend (PostgreSQL or in-process)
//! - Optional Redis client for presence and activity
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use chatroom_server::config::Settings;
use chatroom_server::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    chatroom_server::telemetry::init_tracing();

    info!("Starting Chatroom Server...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        storage = settings.storage.backend.as_str(),
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
