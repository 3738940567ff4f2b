//! Manual net-worth asset handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{AssetResponse, CreateAssetRequest},
    AppState,
};

pub async fn create_asset(
    State(state): State<AppState>,
    Json(payload): Json<CreateAssetRequest>,
) -> Result<(StatusCode, Json<AssetResponse>), AppError> {
    payload.validate()?;

    state
        .db
        .get_user(payload.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let asset = state
        .db
        .create_asset(payload.user_id, &payload.description, payload.value)
        .await?;

    Ok((StatusCode::CREATED, Json(AssetResponse::from(asset))))
}

pub async fn get_user_assets(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<AssetResponse>>, AppError> {
    let assets = state.db.get_assets_by_user(user_id).await?;
    Ok(Json(assets.into_iter().map(AssetResponse::from).collect()))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_asset(asset_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Asset not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
