//! publy server entry point.
//!
//! Starts the Axum HTTP server with the publish and subscribe endpoints.

use tracing_subscriber::EnvFilter;

use publy::config::RelayConfig;
use publy::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = RelayConfig::load()?;
    let (host, port) = config.listen_addr();
    tracing::info!(host, port, "starting publy");

    // Start server
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");

    server::serve(listener, config, server::shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}
