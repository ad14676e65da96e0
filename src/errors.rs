use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::engine::CycleError;

/// Errors surfaced by the HTTP layer. Bodies are always
/// `{ "ok": false, "error": "..." }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::Cycle(CycleError::Unauthorized) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Cycle(CycleError::UnknownIdentity(_)) => StatusCode::NOT_FOUND,
            AppError::Cycle(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Infrastructure detail stays in the logs
        let message = if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_status_mapping() {
        assert_eq!(AppError::from(CycleError::Unauthorized).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::from(CycleError::UnknownIdentity("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(CycleError::Store(anyhow::anyhow!("down"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::BadRequest("bad".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        assert_eq!(AppError::BadRequest("identity is required".into()).to_string(), "identity is required");
        assert_eq!(
            AppError::from(CycleError::UnknownIdentity("ghost".into())).to_string(),
            "unknown identity: ghost"
        );
    }
}
