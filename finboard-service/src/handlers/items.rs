//! Item handlers: the bank-link lifecycle.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateItemRequest, ItemResponse, SyncResponse, UpdateItemStatusRequest},
    models::ItemStatus,
    services::metrics::ITEMS_LINKED_TOTAL,
    AppState,
};

/// Link a new bank connection.
///
/// Exchanges the public token, creates the item, and runs the first
/// reconciliation. When the sync produces no accounts the item is
/// discarded and an empty object is returned, per the link contract.
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    payload.validate()?;

    let user = state
        .db
        .get_user(payload.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let exchange = state
        .aggregator
        .exchange_public_token(&payload.public_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Public token exchange failed");
            AppError::BadGateway(e.to_string())
        })?;

    let item = state
        .db
        .create_item(
            user.id,
            &exchange.item_id,
            &exchange.access_token,
            &payload.institution_id,
        )
        .await?;

    let outcome = match state.sync.sync_item(&exchange.item_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // The item stays; its cursor is still unset, so a later sync
            // retries the full feed.
            ITEMS_LINKED_TOTAL.with_label_values(&["error"]).inc();
            return Err(e);
        }
    };

    if !outcome.item_live {
        ITEMS_LINKED_TOTAL.with_label_values(&["empty"]).inc();
        tracing::warn!(item_id = %item.id, "Link produced no accounts; discarding item");
        state.db.delete_item(item.id).await?;
        return Ok((StatusCode::OK, Json(serde_json::json!({}))));
    }

    ITEMS_LINKED_TOTAL.with_label_values(&["live"]).inc();

    let item = state
        .db
        .get_item(item.id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Item vanished during link")))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(ItemResponse::from(item)).map_err(anyhow::Error::new)?),
    ))
}

pub async fn update_item_status(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemStatusRequest>,
) -> Result<StatusCode, AppError> {
    let status = ItemStatus::parse(&payload.status).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Invalid status '{}'; accepted values: {}",
            payload.status,
            ItemStatus::ACCEPTED.join(", ")
        ))
    })?;

    let updated = state.db.update_item_status(item_id, status).await?;
    if updated == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Item not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Remove the item at the aggregator, then locally (cascading to its
/// accounts and transactions).
pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let item = state
        .db
        .get_item(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Item not found")))?;

    state
        .aggregator
        .remove_item(&item.access_token)
        .await
        .map_err(|e| {
            tracing::error!(item_id = %item_id, error = %e, "Aggregator item removal failed");
            AppError::BadGateway(e.to_string())
        })?;

    state.db.delete_item(item_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Re-run reconciliation for an item (webhook-style trigger).
pub async fn sync_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<SyncResponse>, AppError> {
    let item = state
        .db
        .get_item(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Item not found")))?;

    let outcome = state.sync.sync_item(&item.external_item_id).await?;

    Ok(Json(SyncResponse {
        added: outcome.added,
        modified: outcome.modified,
        removed: outcome.removed,
        skipped: outcome.skipped,
        item_live: outcome.item_live,
    }))
}
