use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),
}

// JSON that parses but does not fit the target type is a 400 too, not axum's 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// Short machine-readable name, sent as `error_type`.
    fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Auth(AuthError::MissingCredential) => "MissingCredential",
            AppError::Auth(AuthError::InvalidCredential) => "InvalidCredential",
            AppError::Auth(AuthError::Repository(e)) | AppError::Repository(e) => match e {
                RepositoryError::Usage(_) => "UsageError",
                RepositoryError::Constraint { .. } => "IntegrityError",
                RepositoryError::MultipleRows { .. } => "MultipleResultsFound",
                RepositoryError::Timeout(_) => "Timeout",
                _ => "DatabaseError",
            },
            AppError::Io(_) => "IOError",
            AppError::Multipart(_) => "UploadError",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::MissingCredential) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::InvalidCredential) => StatusCode::FORBIDDEN,
            AppError::Auth(AuthError::Repository(e)) | AppError::Repository(e) => match e {
                RepositoryError::Usage(_) => StatusCode::BAD_REQUEST,
                RepositoryError::Constraint { .. } => StatusCode::CONFLICT,
                RepositoryError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Multipart(e) => e.status(),
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error_type = self.error_type(), "{}", self);
            match status {
                StatusCode::SERVICE_UNAVAILABLE => self.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            tracing::debug!(error_type = self.error_type(), %status, "{}", self);
            self.to_string()
        };

        let body = json!({
            "result": false,
            "error_type": self.error_type(),
            "error_message": message,
        });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
