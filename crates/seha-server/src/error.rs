use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("No backup found for user {0}")]
    BackupNotFound(Uuid),

    #[error("Backup too large: {size} bytes (max {max})")]
    BackupTooLarge { size: usize, max: usize },

    #[error("Backup storage error: {0}")]
    BackupStorage(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BackupNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::BackupTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            ServerError::BackupStorage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Backup storage error".to_string())
            }
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
