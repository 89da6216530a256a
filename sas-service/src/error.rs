use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::dtos::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    /// Token missing, malformed, expired, or bound to a different entity.
    /// The cause is logged server-side; clients only ever see the generic
    /// message.
    #[error("Invalid token.")]
    Unauthorized,

    /// The entity ID could not be mapped to a stored object.
    #[error("Failed to generate SAS link")]
    NotResolvable,

    /// The resolved object is absent from the store.
    #[error("Not Found")]
    NotFound,

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid token."),
            // Resolution failure is reported in-band with a failure code,
            // unlike a missing object which is a plain 404.
            AppError::NotResolvable => (StatusCode::OK, "Failed to generate SAS link"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found"),
            AppError::InternalError(err) => {
                tracing::error!("Internal error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            AppError::ConfigError(err) => {
                tracing::error!("Configuration error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn envelope_of(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_renders_401_with_generic_message() {
        let (status, body) = envelope_of(AppError::Unauthorized.into_response()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 0);
        assert_eq!(body["message"], "Invalid token.");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn not_resolvable_renders_200_with_failure_code() {
        let (status, body) = envelope_of(AppError::NotResolvable.into_response()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        assert_eq!(body["message"], "Failed to generate SAS link");
    }

    #[tokio::test]
    async fn not_found_renders_404() {
        let (status, body) = envelope_of(AppError::NotFound.into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Not Found");
    }

    #[tokio::test]
    async fn internal_error_detail_stays_server_side() {
        let err = AppError::InternalError(anyhow::anyhow!("account key is garbage"));
        let (status, body) = envelope_of(err.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal Server Error");
        assert!(!body.to_string().contains("garbage"));
    }
}
