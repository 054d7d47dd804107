use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The message returned for every failure that is not operational.
const GENERIC_SERVER_MESSAGE: &str = "Something went very wrong!";

/// The application's error type.
///
/// Every handler and middleware funnels failures through this type so that
/// `IntoResponse` below is the only place a failure becomes an HTTP response.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A validation error (400).
    #[error("Validation error: {0}")]
    Validation(String),

    /// An authentication error (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An authorization error (403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A resource not found error (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// An operational server error whose message is safe to show (500).
    #[error("Server error: {0}")]
    Server(String),

    /// An unexpected internal error (500, message hidden).
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Server(_)
            | AppError::Internal(_)
            | AppError::Database(_)
            | AppError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        let message = report
            .iter()
            .map(|(path, error)| format!("{}: {}", path, error))
            .collect::<Vec<_>>()
            .join(". ");
        AppError::Validation(format!("Invalid input data. {}", message))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                GENERIC_SERVER_MESSAGE.to_string()
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                GENERIC_SERVER_MESSAGE.to_string()
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                GENERIC_SERVER_MESSAGE.to_string()
            }

            AppError::Server(msg) => {
                tracing::error!("Server error: {}", msg);
                msg
            }

            AppError::Unauthorized(msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                msg
            }

            AppError::Forbidden(msg) => {
                tracing::warn!("Authorization failed: {}", msg);
                msg
            }

            AppError::NotFound(msg) => {
                tracing::debug!("Resource not found: {}", msg);
                msg
            }

            AppError::Validation(msg) => {
                tracing::debug!("Validation error: {}", msg);
                msg
            }
        };

        let label = if status.is_client_error() { "fail" } else { "error" };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "status": label,
            "message": message
        }))
        .unwrap_or_else(|_| r#"{"status":"error","message":"Something went very wrong!"}"#.to_string());

        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Server("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_message_is_hidden() {
        let response = AppError::Internal("pool exploded".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], GENERIC_SERVER_MESSAGE);
    }

    #[tokio::test]
    async fn test_client_errors_are_labelled_fail() {
        let response = AppError::Validation("Please provide email and password!".into())
            .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Please provide email and password!");
    }
}
