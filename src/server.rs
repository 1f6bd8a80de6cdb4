//! Process wiring: builds the shared state and router, serves connections
//! and shuts down gracefully.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::domain::ChannelRegistry;
use crate::service::PublishService;

/// How long shutdown waits for subscriber connections to leave.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Builds the application state around a fresh registry.
///
/// The returned sender flips the shutdown flag seen by every subscriber
/// connection.
#[must_use]
pub fn build_state(config: &RelayConfig) -> (AppState, watch::Sender<bool>) {
    let registry = Arc::new(ChannelRegistry::new());
    let publish_service = Arc::new(PublishService::new(registry, config.send_timeout));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = AppState {
        publish_service,
        subscriber_queue_capacity: config.subscriber_queue_capacity,
        shutdown: shutdown_rx,
    };
    (state, shutdown_tx)
}

/// Builds the router with all middleware applied.
pub fn build_app(state: AppState, config: &RelayConfig) -> Router {
    let app = api::build_router()
        .layer(DefaultBodyLimit::max(config.max_payload_bytes))
        .layer(TraceLayer::new_for_http());

    let app = if config.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    app.with_state(state)
}

/// Serves the relay on `listener` until `signal` resolves, then closes every
/// subscriber connection.
///
/// # Errors
///
/// Returns an error if accepting or serving connections fails.
pub async fn serve<F>(listener: TcpListener, config: RelayConfig, signal: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (state, shutdown_tx) = build_state(&config);
    let registry = Arc::clone(state.publish_service.registry());
    let app = build_app(state, &config);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("shutdown requested, closing subscribers");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    drain(&registry, DRAIN_TIMEOUT).await;
    Ok(())
}

/// Waits until every subscriber has left or `timeout` elapses.
async fn drain(registry: &ChannelRegistry, timeout: Duration) {
    let waited = tokio::time::timeout(timeout, async {
        while registry.channel_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    if waited.is_err() {
        let stats = registry.stats().await;
        tracing::warn!(
            channels = stats.channels,
            listeners = stats.listeners,
            "subscribers still connected at shutdown"
        );
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
