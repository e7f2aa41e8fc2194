use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::api::dtos::{
    requests::CreateBookingRequest,
    responses::{BookingResponse, CancelResponse},
};
use crate::api::extractors::{
    auth::{AdminUser, AuthUser},
    idempotency::IdempotencyKey,
    json::ApiJson,
};
use crate::domain::models::{
    booking::{Booking, NewBookingParams},
    event::{Event, EventSummary},
    job::Job,
    notification::{NewNotification, NotificationType},
    user::{User, UserSummary},
};
use crate::domain::services::reservation::{normalize_request, plan_reservation, request_fingerprint};
use crate::error::AppError;
use crate::state::AppState;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdempotencyKey(key): IdempotencyKey,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> Result<Response, AppError> {
    let selection = normalize_request(&payload.tickets)?;
    let fingerprint = request_fingerprint(&payload.event_id, &selection);

    if let Some(key) = key.as_deref()
        && let Some(existing) = state.booking_repo.find_by_idempotency_key(&user.id, key).await? {
        info!("Replaying booking {} for idempotency key", existing.id);
        return replay(&state, existing, &fingerprint).await;
    }

    let event = state.event_repo.find_by_id(&payload.event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    let plan = plan_reservation(&event, &selection)?;

    let booking = Booking::new(NewBookingParams {
        event_id: event.id.clone(),
        user_id: user.id.clone(),
        tickets: plan.lines,
        total_amount: plan.total_amount,
        request_hash: key.as_ref().map(|_| fingerprint.clone()),
        idempotency_key: key.clone(),
    });
    let jobs = [Job::booking_confirmation(&booking.id, &user.id)];

    let created = match state.booking_repo.reserve(&booking, &jobs).await {
        Ok(created) => created,
        Err(e) if key.is_some() && e.is_unique_violation() => {
            // A concurrent request with the same key committed first.
            let Some(existing) = state.booking_repo
                .find_by_idempotency_key(&user.id, key.as_deref().unwrap_or_default())
                .await?
            else {
                return Err(e);
            };
            return replay(&state, existing, &fingerprint).await;
        }
        Err(e) => return Err(e),
    };

    info!(
        booking_id = %created.id,
        event_id = %event.id,
        tickets = plan.total_tickets,
        "Booking confirmed"
    );

    state.notifier.emit(
        NewNotification::new(
            &user.id,
            NotificationType::Booking,
            "Booking Confirmed",
            format!(
                "Your booking for {} has been confirmed. Reference: {}",
                event.title, created.booking_reference
            ),
        )
        .for_event(&event.id)
        .for_booking(&created.id),
    );

    let body = BookingResponse {
        booking: created,
        event: Some(EventSummary::from(&event)),
        user: Some(UserSummary::from(&user)),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn replay(state: &Arc<AppState>, existing: Booking, fingerprint: &str) -> Result<Response, AppError> {
    if existing.request_hash.as_deref() != Some(fingerprint) {
        return Err(AppError::Conflict(
            "Idempotency-Key was already used with a different request".into(),
        ));
    }
    let body = resolve(state, vec![existing]).await?.pop().ok_or(AppError::Internal)?;
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Attaches event and purchaser summaries, loading each distinct row once.
pub async fn resolve(state: &Arc<AppState>, bookings: Vec<Booking>) -> Result<Vec<BookingResponse>, AppError> {
    let mut events: HashMap<String, Option<Event>> = HashMap::new();
    let mut users: HashMap<String, Option<User>> = HashMap::new();

    for booking in &bookings {
        if !events.contains_key(&booking.event_id) {
            let event = state.event_repo.find_by_id(&booking.event_id).await?;
            events.insert(booking.event_id.clone(), event);
        }
        if !users.contains_key(&booking.user_id) {
            let user = state.user_repo.find_by_id(&booking.user_id).await?;
            users.insert(booking.user_id.clone(), user);
        }
    }

    Ok(bookings
        .into_iter()
        .map(|booking| BookingResponse {
            event: events.get(&booking.event_id).and_then(Option::as_ref).map(EventSummary::from),
            user: users.get(&booking.user_id).and_then(Option::as_ref).map(UserSummary::from),
            booking,
        })
        .collect())
}

pub async fn list_my_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_repo.list_by_user(&user.id).await?;
    Ok(Json(resolve(&state, bookings).await?))
}

pub async fn list_all_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_repo.list_all().await?;
    Ok(Json(resolve(&state, bookings).await?))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking_repo.find_by_id(&booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    if !user.owns_or_admin(&booking.user_id) {
        return Err(AppError::Forbidden("Not authorized".into()));
    }

    let body = resolve(&state, vec![booking]).await?.pop().ok_or(AppError::Internal)?;
    Ok(Json(body))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking_repo.find_by_id(&booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    if !user.owns_or_admin(&booking.user_id) {
        return Err(AppError::Forbidden("Not authorized".into()));
    }
    if booking.is_cancelled() {
        return Err(AppError::Conflict("Booking is already cancelled".into()));
    }

    let jobs = [Job::booking_cancellation(&booking.id, &booking.user_id)];
    let outcome = state.booking_repo.cancel(&booking, &jobs).await?;

    if outcome.event_found {
        info!(booking_id = %booking.id, released = outcome.released_seats, "Booking cancelled");
    } else {
        warn!(booking_id = %booking.id, "Booking cancelled after its event was deleted, no inventory released");
    }

    let event_title = state.event_repo.find_by_id(&booking.event_id).await?
        .map(|e| e.title)
        .unwrap_or_else(|| "your event".to_string());

    state.notifier.emit(
        NewNotification::new(
            &booking.user_id,
            NotificationType::Cancellation,
            "Booking Cancelled",
            format!(
                "Your booking for {} has been cancelled. Reference: {}",
                event_title, booking.booking_reference
            ),
        )
        .for_event(&booking.event_id)
        .for_booking(&booking.id),
    );

    Ok(Json(CancelResponse {
        message: "Booking cancelled".into(),
        booking: outcome.booking,
    }))
}
