use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crate::api::dtos::{requests::CreateAnnouncementRequest, responses::MessageResponse};
use crate::api::extractors::{auth::OrganizerUser, json::ApiJson};
use crate::domain::models::{
    announcement::Announcement,
    job::Job,
    notification::{NewNotification, NotificationType},
};
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;

pub async fn create_announcement(
    State(state): State<Arc<AppState>>,
    OrganizerUser(user): OrganizerUser,
    ApiJson(payload): ApiJson<CreateAnnouncementRequest>,
) -> Result<impl IntoResponse, AppError> {
    let title = payload.title.trim();
    let message = payload.message.trim();
    if title.is_empty() || message.is_empty() {
        return Err(AppError::InvalidRequest("Title and message are required".into()));
    }

    let event = state.event_repo.find_by_id(&payload.event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    if !user.owns_or_admin(&event.organizer_id) {
        return Err(AppError::Forbidden("Not authorized".into()));
    }

    let recipients = state.booking_repo.confirmed_attendees(&event.id).await?;
    let announcement = Announcement::new(
        event.id.clone(),
        user.id.clone(),
        title.to_string(),
        message.to_string(),
        recipients,
    );

    let jobs: Vec<Job> = announcement.sent_to
        .iter()
        .map(|recipient| Job::announcement(&announcement.id, recipient))
        .collect();

    let created = state.announcement_repo.create(&announcement, &jobs).await?;
    info!(
        announcement_id = %created.id,
        event_id = %event.id,
        recipients = created.sent_to.len(),
        "Announcement sent"
    );

    state.notifier.emit_all(created.sent_to.iter().map(|recipient| {
        NewNotification::new(
            recipient,
            NotificationType::EventUpdate,
            format!("Announcement: {}", created.title),
            created.message.clone(),
        )
        .for_event(&event.id)
    }));

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_event_announcements(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let announcements = state.announcement_repo.list_by_event(&event_id).await?;
    Ok(Json(announcements))
}

pub async fn delete_announcement(
    State(state): State<Arc<AppState>>,
    OrganizerUser(user): OrganizerUser,
    Path(announcement_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let announcement = state.announcement_repo.find_by_id(&announcement_id).await?
        .ok_or(AppError::NotFound("Announcement not found".into()))?;

    if !user.owns_or_admin(&announcement.organizer_id) {
        return Err(AppError::Forbidden("Not authorized".into()));
    }

    state.announcement_repo.delete(&announcement.id).await?;
    Ok(Json(MessageResponse::new("Announcement deleted")))
}
