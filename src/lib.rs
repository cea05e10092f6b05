use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Components, leaves first.
pub mod auth;
pub mod authorization;
pub mod config;
pub mod enrich;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod query;
pub mod repository;

// Routing, split by access requirement.
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::{TokenVerifier, VerifierState};
pub use config::AppConfig;
pub use enrich::Enricher;
pub use error::{AppError, AppResult};
pub use identity::{HttpIdentityClient, IdentityState};
pub use repository::{MemoryContentStore, PostgresContentStore, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and wire schema into one OpenAPI
/// document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_all_posts, handlers::add_post, handlers::filter_posts,
        handlers::inject_posts, handlers::delete_all_posts, handlers::delete_post,
        handlers::get_post, handlers::get_latest_post,
        handlers::get_all_comments, handlers::add_comment, handlers::filter_comments,
        handlers::inject_comments, handlers::delete_all_comments, handlers::delete_comment,
        handlers::get_comment, handlers::health
    ),
    components(
        schemas(
            models::Post, models::Comment, models::ContentItem, models::NewPost,
            models::NewComment, models::Filter, models::UserProfile, models::EnrichedItem,
        )
    ),
    tags(
        (name = "content-service", description = "Posts and comments with author enrichment")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Everything a request may need, shared by cheap clones. All members are immutable
/// after startup; storage and identity are trait objects so tests can swap them.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for posts and comments.
    pub repo: RepositoryState,
    /// Identity service client, used for the caller's own profile on deletes.
    pub identity: IdentityState,
    /// Author enrichment over the same identity client.
    pub enricher: Enricher,
    /// Bearer-token verification with the startup-loaded public key.
    pub verifier: VerifierState,
}

impl AppState {
    pub fn new(
        repo: RepositoryState,
        identity: IdentityState,
        verifier: VerifierState,
    ) -> Self {
        Self {
            repo,
            enricher: Enricher::new(identity.clone()),
            identity,
            verifier,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Required by the `AuthUser` extractor.
impl FromRef<AppState> for VerifierState {
    fn from_ref(app_state: &AppState) -> VerifierState {
        app_state.verifier.clone()
    }
}

/// auth_middleware
///
/// Guards the whole `/content` router. Running the `AuthUser` extractor here rejects a
/// missing or invalid token with 401 before any handler, and so before any storage
/// or identity call.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles routes, the authentication layer, observability layers and CORS, and
/// binds the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(public::public_routes())
        .nest(
            "/content",
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // Request id is generated first so the trace span and the response both carry it.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request, tagged with method, uri and the `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
