use axum::{
    body::Body,
    extract::Request,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{admin, announcement, auth, booking, event, health, notification, organizer, review};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Accounts
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/profile", get(auth::get_profile).put(auth::update_profile))

        // Events
        .route("/api/v1/events", get(event::list_events).post(event::create_event))
        .route("/api/v1/events/mine", get(event::list_my_events))
        .route("/api/v1/events/{id}", get(event::get_event).put(event::update_event).delete(event::delete_event))

        // Bookings
        .route("/api/v1/bookings", post(booking::create_booking).get(booking::list_all_bookings))
        .route("/api/v1/bookings/mine", get(booking::list_my_bookings))
        .route("/api/v1/bookings/{id}", get(booking::get_booking).delete(booking::cancel_booking))

        // Organizer reporting
        .route("/api/v1/organizer/stats", get(organizer::get_stats))
        .route("/api/v1/organizer/events/{id}/dashboard", get(organizer::get_event_dashboard))

        // Reviews
        .route("/api/v1/reviews", post(review::create_review))
        .route("/api/v1/reviews/event/{event_id}", get(review::list_event_reviews))
        .route("/api/v1/reviews/{id}", put(review::update_review).delete(review::delete_review))

        // Announcements
        .route("/api/v1/announcements", post(announcement::create_announcement))
        .route("/api/v1/announcements/event/{event_id}", get(announcement::list_event_announcements))
        .route("/api/v1/announcements/{id}", delete(announcement::delete_announcement))

        // Notifications
        .route("/api/v1/notifications", get(notification::list_notifications))
        .route("/api/v1/notifications/unread-count", get(notification::unread_count))
        .route("/api/v1/notifications/mark-all-read", put(notification::mark_all_read))
        .route("/api/v1/notifications/{id}", put(notification::mark_read).delete(notification::delete_notification))

        // Admin
        .route("/api/v1/admin/stats", get(admin::get_stats))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route("/api/v1/admin/users/{id}", put(admin::update_user_role).delete(admin::delete_user))
        .route("/api/v1/admin/users/{id}/suspend", put(admin::suspend_user))
        .route("/api/v1/admin/users/{id}/unsuspend", put(admin::unsuspend_user))
        .route("/api/v1/admin/organizers", get(admin::list_organizers))
        .route("/api/v1/admin/events", get(admin::list_events))
        .route("/api/v1/admin/events/{id}", delete(admin::delete_event))
        .route("/api/v1/admin/events/{id}/approve", put(admin::approve_event))
        .route("/api/v1/admin/events/{id}/reject", put(admin::reject_event))
        .route("/api/v1/admin/reviews", get(admin::list_reviews))
        .route("/api/v1/admin/reviews/{id}", delete(admin::delete_review))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
