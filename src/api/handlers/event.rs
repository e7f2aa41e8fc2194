use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crate::api::dtos::{
    requests::{EventQuery, EventRequest},
    responses::MessageResponse,
};
use crate::api::extractors::{
    auth::{AuthUser, OrganizerUser},
    json::{ApiJson, ApiQuery},
};
use crate::domain::models::event::{Event, EventFilter, EventStatus, NewEventParams};
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<EventQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = EventFilter {
        category: query.category,
        search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        status: Some(query.status.unwrap_or(EventStatus::Published)),
        organizer_id: None,
    };
    let events = state.event_repo.list(&filter).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;
    Ok(Json(event))
}

pub async fn list_my_events(
    State(state): State<Arc<AppState>>,
    OrganizerUser(user): OrganizerUser,
) -> Result<impl IntoResponse, AppError> {
    let filter = EventFilter { organizer_id: Some(user.id), ..Default::default() };
    let events = state.event_repo.list_recent(&filter).await?;
    Ok(Json(events))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    OrganizerUser(user): OrganizerUser,
    ApiJson(payload): ApiJson<EventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ticket_types = payload.validated_ticket_types()?;

    let event = Event::new(NewEventParams {
        title: payload.title.trim().to_string(),
        description: payload.description,
        category: payload.category,
        date: payload.date,
        time: payload.time,
        location: payload.location,
        image: payload.image.filter(|i| !i.trim().is_empty()),
        organizer_id: user.id.clone(),
        ticket_types,
        status: payload.status.unwrap_or(EventStatus::Published),
        total_seats: payload.total_seats,
    });

    let created = state.event_repo.create(&event).await?;
    info!(event_id = %created.id, organizer_id = %user.id, "Created event");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    ApiJson(payload): ApiJson<EventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    if !user.owns_or_admin(&existing.organizer_id) {
        return Err(AppError::Forbidden("Not authorized to update this event".into()));
    }

    let ticket_types = payload.validated_ticket_types()?;
    let requested_status = payload.status;

    let edited = Event {
        title: payload.title.trim().to_string(),
        description: payload.description,
        category: payload.category,
        date: payload.date,
        time: payload.time,
        location: payload.location,
        image: payload.image
            .filter(|i| !i.trim().is_empty())
            .unwrap_or(existing.image),
        ticket_types,
        total_seats: payload.total_seats,
        ..existing
    };

    let mut updated = state.event_repo.update(&edited).await?;

    if let Some(status) = requested_status
        && status != updated.status {
        updated = state.event_repo.set_status(&updated.id, status).await?
            .ok_or(AppError::NotFound("Event not found".into()))?;
    }

    info!(event_id = %updated.id, available = updated.available_seats, "Updated event");
    Ok(Json(updated))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    if !user.owns_or_admin(&event.organizer_id) {
        return Err(AppError::Forbidden("Not authorized to delete this event".into()));
    }

    state.event_repo.delete(&event.id).await?;
    info!(event_id = %event.id, "Deleted event");

    Ok(Json(MessageResponse::new("Event removed")))
}
