use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::json;

use crate::dtos::{ApiResponse, SasLinkParams};
use crate::error::AppError;
use crate::services::auth::credential_header;
use crate::services::ResourceKind;
use crate::startup::AppState;

/// GET /sas/report/:entity_id
pub async fn report_sas(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(params): Query<SasLinkParams>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse>, AppError> {
    issue_link(&state, &headers, &entity_id, ResourceKind::Report, &params).await
}

/// GET /sas/certificate/:entity_id
pub async fn certificate_sas(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(params): Query<SasLinkParams>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse>, AppError> {
    issue_link(
        &state,
        &headers,
        &entity_id,
        ResourceKind::Certificate,
        &params,
    )
    .await
}

/// Shared pipeline for both resource kinds: verify the caller's token,
/// resolve the object coordinates, confirm the object is actually there,
/// then mint the signed URL. Each stage short-circuits on failure.
async fn issue_link(
    state: &AppState,
    headers: &HeaderMap,
    entity_id: &str,
    kind: ResourceKind,
    params: &SasLinkParams,
) -> Result<Json<ApiResponse>, AppError> {
    let claims = state.verifier.verify(credential_header(headers), entity_id)?;

    let locator = state.resolver.resolve(entity_id, kind, params)?;

    if !state
        .store
        .exists(&locator.container, &locator.object_name)
        .await
    {
        tracing::info!(
            "Object {}/{} absent for entity {}",
            locator.container,
            locator.object_name,
            entity_id
        );
        return Err(AppError::NotFound);
    }

    let url = state.signer.sign(&locator)?;
    tracing::info!(
        "Issued {:?} link for entity {} (user {})",
        kind,
        entity_id,
        claims.user_id.as_deref().unwrap_or("-")
    );

    Ok(Json(ApiResponse::success("Success", json!(url))))
}
