//! User handlers: identity records plus the per-user read endpoints the
//! dashboard consumes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        AccountResponse, CreateUserRequest, IncomeBillsRequest, IncomeBillsResponse, ItemResponse,
        RecurringTransactionResponse, TransactionResponse, UserResponse,
    },
    models::User,
    services::recurring::detect_recurring,
    AppState,
};

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.validate()?;

    let user = state
        .db
        .create_user(&payload.auth_id, &payload.username)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = require_user(&state, user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_user(user_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("User not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    require_user(&state, user_id).await?;

    let transactions = state.db.get_transactions_by_user(user_id).await?;
    Ok(Json(
        transactions.into_iter().map(TransactionResponse::from).collect(),
    ))
}

/// Run the recurring-charge heuristic over the user's full history.
pub async fn get_user_recurring_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<RecurringTransactionResponse>>, AppError> {
    require_user(&state, user_id).await?;

    let transactions = state.db.get_transactions_by_user(user_id).await?;
    let matches = detect_recurring(&transactions);

    Ok(Json(
        matches
            .into_iter()
            .map(RecurringTransactionResponse::from)
            .collect(),
    ))
}

pub async fn get_user_accounts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    require_user(&state, user_id).await?;

    let accounts = state.db.get_accounts_by_user(user_id).await?;
    Ok(Json(
        accounts.into_iter().map(AccountResponse::from).collect(),
    ))
}

pub async fn get_user_items(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    require_user(&state, user_id).await?;

    let items = state.db.get_items_by_user(user_id).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

pub async fn get_income_bills(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<IncomeBillsResponse>, AppError> {
    let user = require_user(&state, user_id).await?;
    Ok(Json(IncomeBillsResponse::from(user)))
}

/// POST and PUT share this handler; both set the figures outright.
pub async fn set_income_bills(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<IncomeBillsRequest>,
) -> Result<Json<IncomeBillsResponse>, AppError> {
    let user = state
        .db
        .set_income_bills(user_id, payload.monthly_income, payload.monthly_bills)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(IncomeBillsResponse::from(user)))
}

async fn require_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))
}
