pub mod sqlite_user_repo;
pub mod sqlite_event_repo;
pub mod sqlite_booking_repo;
pub mod sqlite_review_repo;
pub mod sqlite_notification_repo;
pub mod sqlite_announcement_repo;
pub mod sqlite_job_repo;

pub mod postgres_user_repo;
pub mod postgres_event_repo;
pub mod postgres_booking_repo;
pub mod postgres_review_repo;
pub mod postgres_notification_repo;
pub mod postgres_announcement_repo;
pub mod postgres_job_repo;

use crate::domain::models::{booking::BookingTicket, event::{Event, TicketType}};
use crate::error::AppError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const MAX_WRITE_RETRIES: u32 = 5;

/// Re-runs a whole transaction while the store reports a write conflict.
pub(crate) async fn with_write_retry<T, F, Fut>(mut attempt_tx: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;
    loop {
        match attempt_tx().await {
            Err(e) if e.is_write_conflict() && attempt < MAX_WRITE_RETRIES => {
                attempt += 1;
                warn!(attempt, "Write conflict, retrying transaction: {}", e);
                tokio::time::sleep(Duration::from_millis(10 * 2u64.pow(attempt))).await;
            }
            other => return other,
        }
    }
}

/// Lines in ticket type name order, the order every ledger transaction locks rows in.
pub(crate) fn lock_order(lines: &[BookingTicket]) -> Vec<&BookingTicket> {
    let mut ordered: Vec<&BookingTicket> = lines.iter().collect();
    ordered.sort_by(|a, b| a.ticket_type.cmp(&b.ticket_type));
    ordered
}

#[derive(sqlx::FromRow)]
pub(crate) struct TicketTypeRow {
    pub event_id: String,
    #[sqlx(flatten)]
    pub ticket: TicketType,
}

/// Distributes ticket type rows (already in position order) onto their events.
pub(crate) fn attach_ticket_types(events: &mut [Event], rows: Vec<TicketTypeRow>) {
    for row in rows {
        if let Some(event) = events.iter_mut().find(|e| e.id == row.event_id) {
            event.ticket_types.push(row.ticket);
        }
    }
}
