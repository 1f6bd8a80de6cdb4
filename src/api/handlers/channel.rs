//! Channel endpoints: subscribe by WebSocket upgrade, publish by plain
//! request.

use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, RawQuery, State};
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::{ChannelId, ChannelIdError};
use crate::error::{ErrorResponse, RelayError};
use crate::service::PublishReport;
use crate::ws::handler::subscribe;

/// `GET /{channel_id}/` — Subscribe, or publish the raw query string.
///
/// A WebSocket upgrade request becomes a subscriber on the channel. Any
/// other `GET` publishes everything after `?` verbatim. `HEAD` is answered
/// with 405 and never publishes.
///
/// # Errors
///
/// Returns [`RelayError::InvalidChannel`] for a malformed channel id and
/// [`RelayError::NoSubscribers`] when publishing to an empty channel.
#[utoipa::path(
    get,
    path = "/{channel_id}/",
    tag = "Channels",
    summary = "Subscribe or publish via query string",
    description = "With WebSocket upgrade headers, subscribes to the channel and receives each published message as one frame. Without them, publishes the raw query string to every current subscriber.",
    params(("channel_id" = String, Path, description = "Channel id (hyphenated UUID v4)")),
    responses(
        (status = 101, description = "Switched to WebSocket; subscriber registered"),
        (status = 200, description = "Message dispatched to every subscriber", body = PublishReport),
        (status = 400, description = "Malformed channel id", body = ErrorResponse),
        (status = 404, description = "No subscribers on channel", body = ErrorResponse),
        (status = 405, description = "HEAD is not supported"),
    )
)]
pub async fn channel_get(
    method: Method,
    State(state): State<AppState>,
    Path(segment): Path<String>,
    RawQuery(query): RawQuery,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, RelayError> {
    // axum serves HEAD through the GET handler.
    if method == Method::HEAD {
        return Ok(method_not_allowed());
    }

    let channel = ChannelId::parse(&segment)?;

    match upgrade {
        Ok(ws) => Ok(subscribe(ws, channel, &state)),
        Err(_) => {
            let payload = Bytes::from(query.unwrap_or_default());
            let report = state.publish_service.publish_to(channel, payload).await?;
            Ok(Json(report).into_response())
        }
    }
}

/// `POST /{channel_id}/` — Publish the request body.
///
/// # Errors
///
/// Returns [`RelayError::InvalidChannel`] for a malformed channel id and
/// [`RelayError::NoSubscribers`] when the channel is empty.
#[utoipa::path(
    post,
    path = "/{channel_id}/",
    tag = "Channels",
    summary = "Publish a message",
    description = "Publishes the request body verbatim to every current subscriber of the channel.",
    params(("channel_id" = String, Path, description = "Channel id (hyphenated UUID v4)")),
    request_body(content = String, description = "Opaque message payload", content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Message dispatched to every subscriber", body = PublishReport),
        (status = 400, description = "Malformed channel id", body = ErrorResponse),
        (status = 404, description = "No subscribers on channel", body = ErrorResponse),
        (status = 413, description = "Payload too large"),
    )
)]
pub async fn channel_post(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    body: Bytes,
) -> Result<Json<PublishReport>, RelayError> {
    let report = state.publish_service.publish(&segment, body).await?;
    Ok(Json(report))
}

/// Fallback for paths that are not a single channel segment (`/`, `/a/b/`).
///
/// Always a 400: the path cannot name a channel.
pub async fn unroutable(uri: Uri) -> RelayError {
    let err = match ChannelId::parse(uri.path().trim_matches('/')) {
        Err(err) => err,
        Ok(_) => ChannelIdError::Format,
    };
    RelayError::InvalidChannel(err)
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, POST, PUT")],
    )
        .into_response()
}

/// Channel routes, with and without the trailing slash.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{channel_id}",
            get(channel_get).post(channel_post).put(channel_post),
        )
        .route(
            "/{channel_id}/",
            get(channel_get).post(channel_post).put(channel_post),
        )
}
