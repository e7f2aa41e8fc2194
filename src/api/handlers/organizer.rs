use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use crate::api::dtos::responses::EventDashboardResponse;
use crate::api::extractors::auth::OrganizerUser;
use crate::api::handlers::booking::resolve;
use crate::domain::models::event::EventFilter;
use crate::domain::services::reporting::{event_dashboard, organizer_stats};
use crate::error::AppError;
use crate::state::AppState;
use chrono::Utc;
use std::sync::Arc;

const RECENT_BOOKINGS: usize = 10;

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    OrganizerUser(user): OrganizerUser,
) -> Result<impl IntoResponse, AppError> {
    let filter = EventFilter { organizer_id: Some(user.id.clone()), ..Default::default() };
    let events = state.event_repo.list_recent(&filter).await?;
    let bookings = state.booking_repo.list_by_organizer(&user.id).await?;
    let reviews = state.review_repo.list_by_organizer(&user.id).await?;

    Ok(Json(organizer_stats(&events, &bookings, &reviews, Utc::now().date_naive())))
}

pub async fn get_event_dashboard(
    State(state): State<Arc<AppState>>,
    OrganizerUser(user): OrganizerUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_id(&event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    if !user.owns_or_admin(&event.organizer_id) {
        return Err(AppError::Forbidden("Not authorized".into()));
    }

    // Newest first.
    let mut bookings = state.booking_repo.list_by_event(&event.id).await?;
    let reviews = state.review_repo.list_by_event(&event.id).await?;

    let dashboard = event_dashboard(event, &bookings, &reviews);
    bookings.truncate(RECENT_BOOKINGS);
    let recent_bookings = resolve(&state, bookings).await?;

    Ok(Json(EventDashboardResponse { dashboard, recent_bookings }))
}
