//! HTTP layer: route handlers, OpenAPI document, and router composition.
//!
//! Routing is by path and upgrade headers only: `/{channel_id}/` is either a
//! subscriber upgrade or a publish; `/health` reports relay statistics.

pub mod doc;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete router with all endpoints.
///
/// Any path no route claims is answered as a malformed channel id.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes())
        .merge(doc::routes())
        .fallback(handlers::channel::unroutable)
}
