use crate::domain::models::{
    booking::Booking,
    event::EventSummary,
    review::Review,
    user::{User, UserSummary},
};
use crate::domain::ports::EventRevenue;
use crate::domain::services::reporting::{EventDashboard, Tally};
use serde::Serialize;

/// A booking with its event and purchaser resolved.
/// `event` is null once the event has been deleted.
#[derive(Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub event: Option<EventSummary>,
    pub user: Option<UserSummary>,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub booking: Booking,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub user: Option<UserSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListResponse {
    pub reviews: Vec<ReviewWithAuthor>,
    pub avg_rating: f64,
    pub total_reviews: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub message: String,
    pub updated: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActionResponse {
    pub message: String,
    pub user: User,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: Tally,
    pub events: Tally,
    pub bookings: Tally,
    pub total_revenue: i64,
    pub top_events: Vec<EventRevenue>,
    pub recent_users: Vec<User>,
    pub recent_bookings: Vec<BookingResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDashboardResponse {
    #[serde(flatten)]
    pub dashboard: EventDashboard,
    pub recent_bookings: Vec<BookingResponse>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
