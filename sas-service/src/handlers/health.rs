use axum::Json;
use serde_json::json;

use crate::dtos::ApiResponse;

/// Liveness probe. Never touches the token verifier or the store.
pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse::success(
        "OK",
        json!({ "version": env!("CARGO_PKG_VERSION") }),
    ))
}
