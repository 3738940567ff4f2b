//! Budget category handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{BudgetCategoryResponse, CreateBudgetCategoryRequest, UpdateBudgetCategoryRequest},
    AppState,
};

pub async fn create_budget_category(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<CreateBudgetCategoryRequest>,
) -> Result<(StatusCode, Json<BudgetCategoryResponse>), AppError> {
    payload.validate()?;

    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let category = state
        .db
        .create_budget_category(user_id, &payload.category, payload.budgeted, payload.actual)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BudgetCategoryResponse::from(category)),
    ))
}

pub async fn list_budget_categories(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<BudgetCategoryResponse>>, AppError> {
    let categories = state.db.list_budget_categories(user_id).await?;
    Ok(Json(
        categories
            .into_iter()
            .map(BudgetCategoryResponse::from)
            .collect(),
    ))
}

pub async fn update_budget_category(
    State(state): State<AppState>,
    Path((user_id, category)): Path<(Uuid, String)>,
    Json(payload): Json<UpdateBudgetCategoryRequest>,
) -> Result<Json<BudgetCategoryResponse>, AppError> {
    let updated = state
        .db
        .update_budget_category(user_id, &category, payload.budgeted, payload.actual)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Budget category not found")))?;

    Ok(Json(BudgetCategoryResponse::from(updated)))
}
