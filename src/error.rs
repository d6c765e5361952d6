//! Error kinds surfaced by the core and their HTTP mapping.
//!
//! Item-level push failures never go through this type -- they're
//! collected into a [`PushAck`](crate::models::PushAck) and returned
//! inside the 200 response. This type is for failures that abort a
//! request outright: REST single-item operations, session/epoch gates,
//! and database-level errors that abort a batch.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::db::DbError;
use crate::extraction::{CursorError, ExtractionError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("gone")]
    Gone,

    #[error("version mismatch")]
    VersionMismatch,

    #[error("parent missing")]
    ParentMissing,

    #[error("session expired")]
    SessionExpired,

    #[error("epoch stale: expected {current}, got {got}")]
    EpochStale { current: i64, got: i64 },

    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },

    #[error("transient error: {0}")]
    Transient(String),

    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Forbidden => "Forbidden",
            ApiError::NotFound => "NotFound",
            ApiError::Gone => "Gone",
            ApiError::VersionMismatch => "VersionMismatch",
            ApiError::ParentMissing => "ParentMissing",
            ApiError::SessionExpired => "SessionExpired",
            ApiError::EpochStale { .. } => "EpochStale",
            ApiError::RateLimited { .. } => "RateLimited",
            ApiError::Transient(_) => "Transient",
            ApiError::Internal(_) => "Internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Gone => StatusCode::GONE,
            ApiError::VersionMismatch => StatusCode::PRECONDITION_FAILED,
            ApiError::ParentMissing => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::SessionExpired | ApiError::EpochStale { .. } => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client. Internal errors are never
    /// leaked verbatim.
    fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Internal(_)) {
            tracing::error!(error = %self, "invariant violation or unhandled failure");
        }

        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.kind(),
                message: self.public_message(),
            },
        };
        let mut response = (status, Json(body)).into_response();

        if let ApiError::RateLimited { retry_after_secs } = &self
            && let Ok(value) = retry_after_secs.to_string().parse()
        {
            response.headers_mut().insert("Retry-After", value);
        }

        response
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => ApiError::NotFound,
            DbError::Duplicate(msg) => ApiError::BadRequest(msg),
            DbError::TransientIO(msg) => ApiError::Transient(msg),
            DbError::Fatal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CursorError> for ApiError {
    fn from(err: CursorError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<crate::services::MutationError> for ApiError {
    fn from(err: crate::services::MutationError) -> Self {
        use crate::services::MutationError;
        match err {
            MutationError::VersionMismatch => ApiError::VersionMismatch,
            MutationError::BadRequest(msg) => ApiError::BadRequest(msg),
            MutationError::ParentMissing(_) => ApiError::ParentMissing,
            MutationError::Db(err) => ApiError::from(err),
        }
    }
}
