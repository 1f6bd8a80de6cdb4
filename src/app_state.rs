//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::service::PublishService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Publish service; owns the channel registry.
    pub publish_service: Arc<PublishService>,
    /// Outbound queue capacity for each new subscriber connection.
    pub subscriber_queue_capacity: usize,
    /// Flips to `true` when the server begins shutting down.
    pub shutdown: watch::Receiver<bool>,
}
