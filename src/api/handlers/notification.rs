use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use crate::api::dtos::responses::{MarkAllReadResponse, MessageResponse, UnreadCountResponse};
use crate::api::extractors::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.notification_repo.list_by_user(&user.id).await?))
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let count = state.notification_repo.unread_count(&user.id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.notification_repo.mark_all_read(&user.id).await?;
    Ok(Json(MarkAllReadResponse { message: "All notifications marked as read".into(), updated }))
}

// Lookups are scoped to the caller, so another user's id reads as missing.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let notification = state.notification_repo.mark_read(&user.id, &notification_id).await?
        .ok_or(AppError::NotFound("Notification not found".into()))?;
    Ok(Json(notification))
}

pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.notification_repo.delete(&user.id, &notification_id).await? {
        return Err(AppError::NotFound("Notification not found".into()));
    }
    Ok(Json(MessageResponse::new("Notification deleted")))
}
