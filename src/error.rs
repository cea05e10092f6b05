use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    auth::TokenError, identity::IdentityError, query::QueryError, repository::StoreError,
};

/// AppError
///
/// The single error type every handler returns. Component errors (token, identity,
/// query, store) are folded into it through `From`, so handlers can use `?` throughout.
///
/// Caller-correctable failures map to 4xx; dependency failures map to 5xx and never
/// leak their details to the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parent post not found: {0}")]
    ParentNotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("identity service unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::ParentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::IdentityUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
            match self {
                AppError::IdentityUnavailable(_) => "identity service unavailable".to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
            } else {
                tracing::debug!(error = %self, status = status.as_u16(), "client error");
            }
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// --- Conversions from component errors ---

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::InvalidToken(err.to_string())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::IdentityUnavailable(err.to_string())
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            StoreError::ParentNotFound(parent) => AppError::ParentNotFound(parent),
            StoreError::Conflict(_) => AppError::Conflict(err.to_string()),
            StoreError::Database(_) => AppError::StorageError(err.to_string()),
        }
    }
}
