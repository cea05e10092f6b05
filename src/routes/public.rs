use crate::{ApiDoc, AppState, handlers};
use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

/// Public Router Module
///
/// Endpoints that never touch storage or the identity service.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for monitoring and load balancers.
        .route("/health", get(handlers::health))
        // GET /api-docs/openapi.json
        // The aggregated OpenAPI document generated from the handler annotations.
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
}
