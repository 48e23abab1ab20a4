//! Presence Handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::application::dto::response::UserStatusResponse;
use crate::domain::UserId;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Get a user's online status
pub async fn get_user_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStatusResponse>, AppError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let status = state.presence.status(user_id).await.map_err(|e| {
        AppError::Internal(format!("Failed to read presence for {}: {}", user_id, e))
    })?;

    Ok(Json(UserStatusResponse { user_id, status }))
}
