use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use repos::error::RepoError;
use thiserror::Error;
use tracing::{error, warn};

use crate::clock::ClockError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    #[error("administrator privileges required")]
    Forbidden,

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: `{0}`")]
    StoreUnavailable(RepoError),

    #[error("internal failure: {0}")]
    InternalFailure(String),

    #[error("session failure: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::UniqueViolation(_, _) => {
                ApiError::Conflict("username or email already registered".to_string())
            }
            other => ApiError::StoreUnavailable(other),
        }
    }
}

impl From<ClockError> for ApiError {
    fn from(err: ClockError) -> Self {
        match err {
            ClockError::PreconditionFailed(action) => {
                ApiError::PreconditionFailed(action.rejection_message().to_string())
            }
            ClockError::Store(err) => ApiError::StoreUnavailable(err),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match &self {
            ApiError::StoreUnavailable(_) => "storage unavailable".to_string(),
            ApiError::InternalFailure(_) | ApiError::Session(_) => "internal failure".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!("Internal Server Error: {}", self);
        } else {
            warn!("Request rejected ({}): {}", status, error_message);
        }

        let body = Json(serde_json::json!({
            "result": "failed",
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
