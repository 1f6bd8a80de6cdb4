//! OpenAPI document for the HTTP surface.

use axum::Router;
use utoipa::OpenApi;

use super::handlers::{channel, system};
use crate::app_state::AppState;
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::PublishReport;

/// Path of the served OpenAPI JSON document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Generated OpenAPI description of the relay.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "publy", description = "Real-time publish/subscribe relay"),
    paths(
        channel::channel_get,
        channel::channel_post,
        system::health_handler,
    ),
    components(schemas(PublishReport, ErrorResponse, ErrorBody, system::HealthResponse)),
    tags(
        (name = "Channels", description = "Subscribe and publish"),
        (name = "System", description = "Health and statistics"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI document, plus Swagger UI when the `swagger-ui`
/// feature is enabled.
#[cfg(feature = "swagger-ui")]
pub fn routes() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()),
    )
}

/// Serves the OpenAPI document, plus Swagger UI when the `swagger-ui`
/// feature is enabled.
#[cfg(not(feature = "swagger-ui"))]
pub fn routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}
