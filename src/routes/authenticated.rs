use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// The content API, nested under `/content` by `create_router`. Handlers receive the
/// verified caller through the `AuthUser` extractor; deletion of a single record is
/// additionally gated on ownership or role inside the handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .nest("/posts", post_routes())
        .nest("/comments", comment_routes())
}

fn post_routes() -> Router<AppState> {
    Router::new()
        // GET/DELETE /content/posts/all
        // Full listing (newest first, enriched) and unconditional bulk delete.
        .route(
            "/all",
            get(handlers::get_all_posts).delete(handlers::delete_all_posts),
        )
        .route("/add", post(handlers::add_post))
        .route("/filter", post(handlers::filter_posts))
        // POST /content/posts/inject
        // Seeding endpoint; keeps client-supplied authors.
        .route("/inject", post(handlers::inject_posts))
        // GET /content/posts/latest/{n}
        .route("/latest/{n}", get(handlers::get_latest_post))
        .route(
            "/{id}",
            get(handlers::get_post).delete(handlers::delete_post),
        )
}

fn comment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/all",
            get(handlers::get_all_comments).delete(handlers::delete_all_comments),
        )
        // POST /content/comments/add
        // The parent post must exist; nothing is written otherwise.
        .route("/add", post(handlers::add_comment))
        .route("/filter", post(handlers::filter_comments))
        .route("/inject", post(handlers::inject_comments))
        .route(
            "/{id}",
            get(handlers::get_comment).delete(handlers::delete_comment),
        )
}
