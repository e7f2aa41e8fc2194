use crate::domain::models::{
    announcement::Announcement,
    booking::{Booking, BookingStatus},
    event::{Event, EventFilter, EventStatus},
    job::Job,
    notification::Notification,
    review::Review,
    user::{Role, User},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn list(&self) -> Result<Vec<User>, AppError>;
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, AppError>;
    async fn update(&self, user: &User) -> Result<User, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    async fn count_by_role(&self) -> Result<Vec<(Role, i64)>, AppError>;
    async fn recent(&self, limit: i64) -> Result<Vec<User>, AppError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    /// Ordered by date, soonest first.
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, AppError>;
    /// Ordered by creation, newest first.
    async fn list_recent(&self, filter: &EventFilter) -> Result<Vec<Event>, AppError>;
    /// Rewrites descriptive fields and the tier layout while keeping every `sold` counter.
    /// `available_seats` is recomputed from the stored ledger inside the same transaction.
    async fn update(&self, event: &Event) -> Result<Event, AppError>;
    async fn set_status(&self, id: &str, status: EventStatus) -> Result<Option<Event>, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    async fn count_by_status(&self) -> Result<Vec<(EventStatus, i64)>, AppError>;
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub booking: Booking,
    pub event_found: bool,
    pub released_seats: i64,
}

#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventRevenue {
    pub event_id: String,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub bookings: i64,
    pub revenue: i64,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Atomically claims inventory and records the booking together with its outbox jobs.
    ///
    /// Each tier is incremented only while `quantity - sold` covers the line, and the
    /// event's `available_seats` only while it covers the total. Any failed condition
    /// rolls the whole transaction back. Write conflicts are retried internally.
    async fn reserve(&self, booking: &Booking, jobs: &[Job]) -> Result<Booking, AppError>;
    /// Flips a non-cancelled booking to cancelled and releases its inventory in one
    /// transaction. Returns `Conflict` when the booking was already cancelled.
    async fn cancel(&self, booking: &Booking, jobs: &[Job]) -> Result<CancelOutcome, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn find_by_idempotency_key(&self, user_id: &str, key: &str) -> Result<Option<Booking>, AppError>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn list_all(&self) -> Result<Vec<Booking>, AppError>;
    async fn recent(&self, limit: i64) -> Result<Vec<Booking>, AppError>;
    async fn count_by_status(&self) -> Result<Vec<(BookingStatus, i64)>, AppError>;
    async fn count_by_user(&self, user_id: &str) -> Result<i64, AppError>;
    async fn confirmed_revenue(&self) -> Result<i64, AppError>;
    async fn top_events_by_revenue(&self, limit: i64) -> Result<Vec<EventRevenue>, AppError>;
    async fn has_confirmed_booking(&self, user_id: &str, event_id: &str) -> Result<bool, AppError>;
    async fn confirmed_attendees(&self, event_id: &str) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, review: &Review) -> Result<Review, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Review>, AppError>;
    async fn find_by_user_and_event(&self, user_id: &str, event_id: &str) -> Result<Option<Review>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Review>, AppError>;
    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Review>, AppError>;
    async fn list_all(&self) -> Result<Vec<Review>, AppError>;
    async fn update(&self, review: &Review) -> Result<Review, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Notification>, AppError>;
    async fn unread_count(&self, user_id: &str) -> Result<i64, AppError>;
    async fn mark_read(&self, user_id: &str, id: &str) -> Result<Option<Notification>, AppError>;
    async fn mark_all_read(&self, user_id: &str) -> Result<u64, AppError>;
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    /// Stores the announcement, its recipient list and the email jobs in one transaction.
    async fn create(&self, announcement: &Announcement, jobs: &[Job]) -> Result<Announcement, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Announcement>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Announcement>, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Moves up to `limit` due jobs from PENDING to PROCESSING and returns them.
    async fn claim_due(&self, limit: i64) -> Result<Vec<Job>, AppError>;
    async fn mark_completed(&self, id: &str) -> Result<(), AppError>;
    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), AppError>;
    /// Returns jobs left in PROCESSING by a previous worker to PENDING.
    async fn requeue_stalled(&self) -> Result<u64, AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str, attachment_name: Option<&str>, attachment_data: Option<&[u8]>) -> Result<(), AppError>;
}
