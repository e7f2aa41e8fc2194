use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use crate::api::dtos::{
    requests::{AdminEventsQuery, RejectEventRequest, UpdateRoleRequest},
    responses::{AdminStats, MessageResponse, UserActionResponse},
};
use crate::api::extractors::{
    auth::AdminUser,
    json::{ApiJson, ApiQuery},
};
use crate::api::handlers::{booking::resolve, review::with_authors};
use crate::domain::models::{
    booking::BookingStatus,
    event::{EventFilter, EventStatus},
    notification::{NewNotification, NotificationType},
    user::{Role, User},
};
use crate::domain::services::reporting::{organizer_overview, Tally};
use crate::error::AppError;
use crate::state::AppState;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

const TOP_EVENTS: i64 = 5;
const RECENT_USERS: i64 = 5;
const RECENT_BOOKINGS: i64 = 10;

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let users = state.user_repo.count_by_role().await?;
    let events = state.event_repo.count_by_status().await?;
    let bookings = state.booking_repo.count_by_status().await?;

    Ok(Json(AdminStats {
        users: Tally::new(
            Role::ALL.map(|r| r.as_str()),
            users.into_iter().map(|(role, n)| (role.as_str(), n)),
        ),
        events: Tally::new(
            EventStatus::ALL.map(|s| s.as_str()),
            events.into_iter().map(|(status, n)| (status.as_str(), n)),
        ),
        bookings: Tally::new(
            BookingStatus::ALL.map(|s| s.as_str()),
            bookings.into_iter().map(|(status, n)| (status.as_str(), n)),
        ),
        total_revenue: state.booking_repo.confirmed_revenue().await?,
        top_events: state.booking_repo.top_events_by_revenue(TOP_EVENTS).await?,
        recent_users: state.user_repo.recent(RECENT_USERS).await?,
        recent_bookings: resolve(&state, state.booking_repo.recent(RECENT_BOOKINGS).await?).await?,
    }))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.user_repo.list().await?))
}

async fn load_user(state: &Arc<AppState>, user_id: &str) -> Result<User, AppError> {
    state.user_repo.find_by_id(user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))
}

pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if user_id == admin.id && payload.role != Role::Admin {
        return Err(AppError::Conflict("You cannot remove your own admin role".into()));
    }

    let mut user = load_user(&state, &user_id).await?;
    user.role = payload.role;
    let user = state.user_repo.update(&user).await?;
    info!(user_id = %user.id, role = %user.role, "Role updated");

    Ok(Json(UserActionResponse { message: "User role updated".into(), user }))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if user_id == admin.id {
        return Err(AppError::Conflict("You cannot delete your own account".into()));
    }

    let user = load_user(&state, &user_id).await?;
    state.user_repo.delete(&user.id).await?;
    info!(user_id = %user.id, "User removed");

    Ok(Json(MessageResponse::new("User removed")))
}

async fn set_suspended(state: &Arc<AppState>, admin: &User, user_id: &str, suspended: bool) -> Result<User, AppError> {
    if user_id == admin.id {
        return Err(AppError::Conflict("You cannot change your own suspension".into()));
    }
    let mut user = load_user(state, user_id).await?;
    user.suspended = suspended;
    state.user_repo.update(&user).await
}

pub async fn suspend_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = set_suspended(&state, &admin, &user_id, true).await?;
    state.notifier.emit(NewNotification::new(
        &user.id,
        NotificationType::EventUpdate,
        "Account Suspended",
        "Your account has been suspended. Please contact support for more information.",
    ));
    Ok(Json(UserActionResponse { message: "User suspended".into(), user }))
}

pub async fn unsuspend_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = set_suspended(&state, &admin, &user_id, false).await?;
    state.notifier.emit(NewNotification::new(
        &user.id,
        NotificationType::EventUpdate,
        "Account Reactivated",
        "Your account has been reactivated. You can now access all features.",
    ));
    Ok(Json(UserActionResponse { message: "User unsuspended".into(), user }))
}

pub async fn list_organizers(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let organizers = state.user_repo.list_by_role(Role::Organizer).await?;
    let events = state.event_repo.list_recent(&EventFilter::default()).await?;
    let bookings = state.booking_repo.list_all().await?;
    Ok(Json(organizer_overview(&organizers, &events, &bookings)))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<AdminEventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = EventFilter { status: query.status, ..Default::default() };
    Ok(Json(state.event_repo.list_recent(&filter).await?))
}

pub async fn approve_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.set_status(&event_id, EventStatus::Published).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    state.notifier.emit(
        NewNotification::new(
            &event.organizer_id,
            NotificationType::EventUpdate,
            "Event Approved",
            format!("Your event \"{}\" has been approved and is now published.", event.title),
        )
        .for_event(&event.id),
    );

    Ok(Json(json!({ "message": "Event approved", "event": event })))
}

pub async fn reject_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(event_id): Path<String>,
    payload: Option<ApiJson<RejectEventRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let reason = payload
        .and_then(|ApiJson(body)| body.reason)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "No reason provided".to_string());

    let event = state.event_repo.set_status(&event_id, EventStatus::Cancelled).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    state.notifier.emit(
        NewNotification::new(
            &event.organizer_id,
            NotificationType::EventUpdate,
            "Event Rejected",
            format!("Your event \"{}\" has been rejected. Reason: {}", event.title, reason),
        )
        .for_event(&event.id),
    );

    Ok(Json(json!({ "message": "Event rejected", "event": event })))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.event_repo.delete(&event_id).await?;
    info!(event_id = %event_id, "Event deleted by admin");
    Ok(Json(MessageResponse::new("Event deleted")))
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let reviews = state.review_repo.list_all().await?;
    Ok(Json(with_authors(&state, reviews).await?))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(review_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.review_repo.delete(&review_id).await?;
    Ok(Json(MessageResponse::new("Review deleted")))
}
