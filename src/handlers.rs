use crate::{
    AppState,
    auth::AuthUser,
    authorization,
    error::{AppError, AppResult},
    models::{Comment, ContentItem, ContentKind, EnrichedItem, Filter, NewComment, NewPost, Post},
    query::{self, ContentQuery},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

// --- Shared Pipelines ---

/// Unwraps a JSON body, turning axum's rejection into a 400 with the same message.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Runs `query` against `kind` and enriches the result with one identity call.
async fn list_enriched(
    state: &AppState,
    auth: &AuthUser,
    kind: ContentKind,
    query: &ContentQuery,
) -> AppResult<Json<Vec<EnrichedItem>>> {
    let items = state.repo.list(kind, query).await?;
    let enriched = state.enricher.enrich(&auth.token, items).await?;
    Ok(Json(enriched))
}

async fn get_enriched(
    state: &AppState,
    auth: &AuthUser,
    kind: ContentKind,
    id: &str,
) -> AppResult<Json<EnrichedItem>> {
    let item = state.repo.get_by_id(kind, id).await?;
    let enriched = state.enricher.enrich_one(&auth.token, item).await?;
    Ok(Json(enriched))
}

/// Delete pipeline: target lookup, caller profile, authorization gate, write.
/// Nothing is deleted unless every step before the write succeeds.
async fn delete_owned(
    state: &AppState,
    auth: &AuthUser,
    kind: ContentKind,
    id: &str,
) -> AppResult<StatusCode> {
    let item = state.repo.get_by_id(kind, id).await?;
    let profile = state.identity.current_profile(&auth.token).await?;

    authorization::authorize(&item, &auth.identity, &profile)?;

    state.repo.delete_by_id(kind, id).await?;
    tracing::info!(kind = kind.label(), %id, user_id = %auth.identity.user_id, "record deleted");
    Ok(StatusCode::ACCEPTED)
}

/// Stores seeded records as given, generating only a missing id or date.
async fn inject(state: &AppState, items: Vec<ContentItem>) -> AppResult<StatusCode> {
    let count = items.len();
    for item in items {
        state.repo.create(item.with_generated_defaults()).await?;
    }
    tracing::info!(count, "records injected");
    Ok(StatusCode::ACCEPTED)
}

async fn delete_every(state: &AppState, auth: &AuthUser, kind: ContentKind) -> AppResult<StatusCode> {
    state.repo.delete_all(kind).await?;
    tracing::warn!(kind = kind.label(), user_id = %auth.identity.user_id, "all records deleted");
    Ok(StatusCode::ACCEPTED)
}

// --- Posts ---

/// get_all_posts
///
/// Every post, newest first, each paired with its author's profile.
#[utoipa::path(
    get,
    path = "/content/posts/all",
    responses(
        (status = 200, description = "All posts", body = [EnrichedItem]),
        (status = 401, description = "Missing or invalid token"),
        (status = 502, description = "Identity service unavailable")
    )
)]
pub async fn get_all_posts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<EnrichedItem>>> {
    list_enriched(&state, &auth, ContentKind::Post, &ContentQuery::all()).await
}

/// add_post
///
/// Creates a post authored by the caller. `id`, `author` and `date` are always
/// assigned here.
#[utoipa::path(
    post,
    path = "/content/posts/add",
    request_body = NewPost,
    responses(
        (status = 202, description = "Post stored", body = Post),
        (status = 400, description = "Malformed body")
    )
)]
pub async fn add_post(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<NewPost>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let post = body(payload)?.into_post(&auth.identity.user_id);
    state.repo.create(ContentItem::Post(post.clone())).await?;

    tracing::info!(id = %post.id, author = %post.author, "post created");
    Ok((StatusCode::ACCEPTED, Json(post)))
}

/// filter_posts
#[utoipa::path(
    post,
    path = "/content/posts/filter",
    request_body = Filter,
    responses(
        (status = 200, description = "Matching posts", body = [EnrichedItem]),
        (status = 400, description = "Malformed body or unknown sort field")
    )
)]
pub async fn filter_posts(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<Filter>, JsonRejection>,
) -> AppResult<Json<Vec<EnrichedItem>>> {
    let query = query::build(ContentKind::Post, &body(payload)?)?;
    list_enriched(&state, &auth, ContentKind::Post, &query).await
}

/// inject_posts
///
/// Bulk seeding. Client-supplied authors are kept.
#[utoipa::path(
    post,
    path = "/content/posts/inject",
    request_body = [Post],
    responses(
        (status = 202, description = "Posts stored"),
        (status = 409, description = "Duplicate id")
    )
)]
pub async fn inject_posts(
    _auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<Vec<Post>>, JsonRejection>,
) -> AppResult<StatusCode> {
    let posts = body(payload)?;
    inject(&state, posts.into_iter().map(ContentItem::from).collect()).await
}

#[utoipa::path(
    delete,
    path = "/content/posts/all",
    responses((status = 202, description = "All posts deleted"))
)]
pub async fn delete_all_posts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    delete_every(&state, &auth, ContentKind::Post).await
}

/// delete_post
///
/// Allowed for the post's author and for admins or moderators.
#[utoipa::path(
    delete,
    path = "/content/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 202, description = "Post deleted"),
        (status = 403, description = "Not the author, admin or moderator"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    delete_owned(&state, &auth, ContentKind::Post, &id).await
}

#[utoipa::path(
    get,
    path = "/content/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = EnrichedItem),
        (status = 404, description = "No such post")
    )
)]
pub async fn get_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<EnrichedItem>> {
    get_enriched(&state, &auth, ContentKind::Post, &id).await
}

/// get_latest_post
///
/// The `n`-th newest post, counting from 0.
#[utoipa::path(
    get,
    path = "/content/posts/latest/{n}",
    params(("n" = u64, Path, description = "Position from the newest post, 0-based")),
    responses(
        (status = 200, description = "The post", body = EnrichedItem),
        (status = 404, description = "Fewer than n + 1 posts exist")
    )
)]
pub async fn get_latest_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(n): Path<u64>,
) -> AppResult<Json<EnrichedItem>> {
    let item = state
        .repo
        .list(ContentKind::Post, &ContentQuery::nth_latest(n))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("no post at position {n}")))?;

    let enriched = state.enricher.enrich_one(&auth.token, item).await?;
    Ok(Json(enriched))
}

// --- Comments ---

#[utoipa::path(
    get,
    path = "/content/comments/all",
    responses((status = 200, description = "All comments", body = [EnrichedItem]))
)]
pub async fn get_all_comments(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<EnrichedItem>>> {
    list_enriched(&state, &auth, ContentKind::Comment, &ContentQuery::all()).await
}

/// add_comment
///
/// Creates a comment on an existing post. Fails with 404 and writes nothing when
/// `parent` names no post.
#[utoipa::path(
    post,
    path = "/content/comments/add",
    request_body = NewComment,
    responses(
        (status = 202, description = "Comment stored", body = Comment),
        (status = 404, description = "Parent post does not exist")
    )
)]
pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = body(payload)?.into_comment(&auth.identity.user_id);
    state
        .repo
        .create(ContentItem::Comment(comment.clone()))
        .await?;

    tracing::info!(id = %comment.id, parent = %comment.parent, "comment created");
    Ok((StatusCode::ACCEPTED, Json(comment)))
}

#[utoipa::path(
    post,
    path = "/content/comments/filter",
    request_body = Filter,
    responses(
        (status = 200, description = "Matching comments", body = [EnrichedItem]),
        (status = 400, description = "Malformed body or unknown sort field")
    )
)]
pub async fn filter_comments(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<Filter>, JsonRejection>,
) -> AppResult<Json<Vec<EnrichedItem>>> {
    let query = query::build(ContentKind::Comment, &body(payload)?)?;
    list_enriched(&state, &auth, ContentKind::Comment, &query).await
}

/// inject_comments
///
/// Bulk seeding; every comment still needs an existing parent post.
#[utoipa::path(
    post,
    path = "/content/comments/inject",
    request_body = [Comment],
    responses(
        (status = 202, description = "Comments stored"),
        (status = 404, description = "A parent post does not exist")
    )
)]
pub async fn inject_comments(
    _auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<Vec<Comment>>, JsonRejection>,
) -> AppResult<StatusCode> {
    let comments = body(payload)?;
    inject(&state, comments.into_iter().map(ContentItem::from).collect()).await
}

#[utoipa::path(
    delete,
    path = "/content/comments/all",
    responses((status = 202, description = "All comments deleted"))
)]
pub async fn delete_all_comments(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    delete_every(&state, &auth, ContentKind::Comment).await
}

#[utoipa::path(
    delete,
    path = "/content/comments/{id}",
    params(("id" = String, Path, description = "Comment id")),
    responses(
        (status = 202, description = "Comment deleted"),
        (status = 403, description = "Not the author, admin or moderator"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    delete_owned(&state, &auth, ContentKind::Comment, &id).await
}

#[utoipa::path(
    get,
    path = "/content/comments/{id}",
    params(("id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "The comment", body = EnrichedItem),
        (status = 404, description = "No such comment")
    )
)]
pub async fn get_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<EnrichedItem>> {
    get_enriched(&state, &auth, ContentKind::Comment, &id).await
}

/// health
///
/// Liveness probe for load balancers; no authentication, no dependencies touched.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
