//! Axum WebSocket upgrade handling for subscribers.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::ChannelId;

/// Accepts the upgrade and hands the socket to a subscriber connection on
/// `channel`. The channel id must already be validated.
pub fn subscribe(ws: WebSocketUpgrade, channel: ChannelId, state: &AppState) -> Response {
    let registry = Arc::clone(state.publish_service.registry());
    let queue_capacity = state.subscriber_queue_capacity;
    let shutdown = state.shutdown.clone();

    tracing::debug!(%channel, "websocket upgrade accepted");

    ws.on_failed_upgrade(move |err| {
        tracing::warn!(%channel, error = %err, "websocket upgrade failed");
    })
    .on_upgrade(move |socket| run_connection(socket, channel, registry, queue_capacity, shutdown))
}
