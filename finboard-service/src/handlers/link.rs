//! Link-flow handlers: token issuance and telemetry.

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::{
    dtos::{LinkEventRequest, LinkTokenRequest, LinkTokenResponse},
    models::LinkEventType,
    AppState,
};

/// Issue a link token for the client-side link flow.
///
/// With an `item_id` the token is issued in update mode: empty product
/// list, existing access token attached.
pub async fn create_link_token(
    State(state): State<AppState>,
    Json(payload): Json<LinkTokenRequest>,
) -> Result<Json<LinkTokenResponse>, AppError> {
    let user = state
        .db
        .get_user(payload.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let item = match payload.item_id {
        Some(item_id) => {
            let item = state
                .db
                .get_item(item_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Item not found")))?;
            if item.user_id != user.id {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Item does not belong to this user"
                )));
            }
            Some(item)
        }
        None => None,
    };

    let response = state
        .aggregator
        .create_link_token(
            &user.id.to_string(),
            item.as_ref().map(|i| i.access_token.as_str()),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Link token issuance failed");
            AppError::BadGateway(e.to_string())
        })?;

    Ok(Json(LinkTokenResponse {
        link_token: response.link_token,
        expiration: response.expiration,
    }))
}

/// Append one link-flow outcome to the telemetry log.
pub async fn record_link_event(
    State(state): State<AppState>,
    Json(payload): Json<LinkEventRequest>,
) -> Result<StatusCode, AppError> {
    let event_type = LinkEventType::parse(&payload.event_type).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Invalid event type '{}'; accepted values: {}",
            payload.event_type,
            LinkEventType::ACCEPTED.join(", ")
        ))
    })?;

    state
        .db
        .create_link_event(
            payload.user_id,
            event_type.as_str(),
            &payload.link_session_id,
            &payload.request_id,
            &payload.error_type,
            &payload.error_code,
        )
        .await?;

    Ok(StatusCode::CREATED)
}
