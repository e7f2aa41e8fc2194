use crate::domain::{
    models::{booking::{Booking, BookingStatus}, job::Job},
    ports::{BookingRepository, CancelOutcome, EventRevenue},
};
use crate::error::{AppError, Shortfall};
use crate::infra::repositories::{postgres_job_repo, lock_order, with_write_retry};
use async_trait::async_trait;
use sqlx::PgPool;
use chrono::Utc;
use tracing::{debug, warn};

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }


    async fn try_reserve(&self, booking: &Booking, jobs: &[Job]) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let now = Utc::now();

        // Row lock on the event serializes ledger writers for it.
        let touched = sqlx::query("UPDATE events SET updated_at = $1 WHERE id = $2 AND status = 'published'")
            .bind(now).bind(&booking.event_id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if touched.rows_affected() == 0 {
            let exists: Option<String> = sqlx::query_scalar("SELECT status FROM events WHERE id = $1")
                .bind(&booking.event_id).fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
            return Err(match exists {
                Some(_) => AppError::InvalidRequest("Event is not available for booking".into()),
                None => AppError::NotFound("Event not found".into()),
            });
        }

        for line in lock_order(&booking.tickets) {
            let claimed = sqlx::query(
                "UPDATE ticket_types SET sold = sold + $1 WHERE event_id = $2 AND name = $3 AND quantity - sold >= $4"
            )
                .bind(line.quantity).bind(&booking.event_id).bind(&line.ticket_type).bind(line.quantity)
                .execute(&mut *tx).await.map_err(AppError::Database)?;

            if claimed.rows_affected() == 0 {
                let remaining: Option<i64> = sqlx::query_scalar("SELECT quantity - sold FROM ticket_types WHERE event_id = $1 AND name = $2")
                    .bind(&booking.event_id).bind(&line.ticket_type)
                    .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
                return Err(match remaining {
                    Some(available) => AppError::InsufficientInventory(Shortfall::TicketType {
                        ticket_type: line.ticket_type.clone(),
                        requested: line.quantity,
                        available,
                    }),
                    None => AppError::InvalidRequest(format!("Ticket type {} not found", line.ticket_type)),
                });
            }
        }

        let total = booking.total_tickets();
        let seated = sqlx::query("UPDATE events SET available_seats = available_seats - $1 WHERE id = $2 AND available_seats >= $3")
            .bind(total).bind(&booking.event_id).bind(total)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if seated.rows_affected() == 0 {
            let available: i64 = sqlx::query_scalar("SELECT available_seats FROM events WHERE id = $1")
                .bind(&booking.event_id).fetch_one(&mut *tx).await.map_err(AppError::Database)?;
            return Err(AppError::InsufficientInventory(Shortfall::Seats { requested: total, available }));
        }

        sqlx::query(
            "INSERT INTO bookings (id, event_id, user_id, tickets, total_amount, status, booking_reference, idempotency_key, request_hash, created_at, cancelled_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        )
            .bind(&booking.id).bind(&booking.event_id).bind(&booking.user_id).bind(&booking.tickets).bind(booking.total_amount)
            .bind(booking.status.as_str()).bind(&booking.booking_reference).bind(&booking.idempotency_key).bind(&booking.request_hash)
            .bind(booking.created_at).bind(booking.cancelled_at)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        postgres_job_repo::enqueue(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(booking.clone())
    }

    async fn try_cancel(&self, booking: &Booking, jobs: &[Job]) -> Result<CancelOutcome, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let now = Utc::now();

        let flipped = sqlx::query("UPDATE bookings SET status = 'cancelled', cancelled_at = $1 WHERE id = $2 AND status <> 'cancelled'")
            .bind(now).bind(&booking.id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if flipped.rows_affected() == 0 {
            return Err(AppError::Conflict("Booking is already cancelled".into()));
        }

        let event_found = sqlx::query("UPDATE events SET updated_at = $1 WHERE id = $2")
            .bind(now).bind(&booking.event_id)
            .execute(&mut *tx).await.map_err(AppError::Database)?
            .rows_affected() > 0;

        let mut released_seats = 0;
        if event_found {
            for line in lock_order(&booking.tickets) {
                let released = sqlx::query("UPDATE ticket_types SET sold = sold - $1 WHERE event_id = $2 AND name = $3 AND sold >= $4")
                    .bind(line.quantity).bind(&booking.event_id).bind(&line.ticket_type).bind(line.quantity)
                    .execute(&mut *tx).await.map_err(AppError::Database)?;
                if released.rows_affected() == 0 {
                    warn!(booking_id = %booking.id, ticket_type = %line.ticket_type, "Ticket type gone, skipping release");
                    continue;
                }
                released_seats += line.quantity;
            }
            if released_seats > 0 {
                sqlx::query("UPDATE events SET available_seats = available_seats + $1 WHERE id = $2")
                    .bind(released_seats).bind(&booking.event_id)
                    .execute(&mut *tx).await.map_err(AppError::Database)?;
            }
        } else {
            warn!(booking_id = %booking.id, event_id = %booking.event_id, "Event deleted, cancelling without inventory release");
        }

        postgres_job_repo::enqueue(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        debug!(booking_id = %booking.id, released_seats, "Booking cancelled");

        let mut cancelled = booking.clone();
        cancelled.status = BookingStatus::Cancelled;
        cancelled.cancelled_at = Some(now);
        Ok(CancelOutcome { booking: cancelled, event_found, released_seats })
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn reserve(&self, booking: &Booking, jobs: &[Job]) -> Result<Booking, AppError> {
        with_write_retry(|| self.try_reserve(booking, jobs)).await
    }

    async fn cancel(&self, booking: &Booking, jobs: &[Job]) -> Result<CancelOutcome, AppError> {
        with_write_retry(|| self.try_cancel(booking, jobs)).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_idempotency_key(&self, user_id: &str, key: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE user_id = $1 AND idempotency_key = $2")
            .bind(user_id).bind(key).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC").bind(user_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE event_id = $1 ORDER BY created_at DESC").bind(event_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT b.* FROM bookings b JOIN events e ON e.id = b.event_id WHERE e.organizer_id = $1 ORDER BY b.created_at DESC"
        )
            .bind(organizer_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_all(&self) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC").fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC LIMIT $1").bind(limit).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_by_status(&self) -> Result<Vec<(BookingStatus, i64)>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM bookings GROUP BY status")
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;
        rows.into_iter()
            .map(|(status, count)| {
                status.parse::<BookingStatus>()
                    .map(|s| (s, count))
                    .map_err(|e| AppError::InternalWithMsg(e.to_string()))
            })
            .collect()
    }

    async fn count_by_user(&self, user_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id = $1").bind(user_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn confirmed_revenue(&self) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM bookings WHERE status = 'confirmed'")
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn top_events_by_revenue(&self, limit: i64) -> Result<Vec<EventRevenue>, AppError> {
        sqlx::query_as::<_, EventRevenue>(
            r#"
            SELECT b.event_id AS event_id, e.title AS title, e.date AS date,
                   COUNT(*) AS bookings, COALESCE(SUM(b.total_amount), 0)::BIGINT AS revenue
            FROM bookings b
            LEFT JOIN events e ON e.id = b.event_id
            WHERE b.status = 'confirmed'
            GROUP BY b.event_id, e.title, e.date
            ORDER BY revenue DESC
            LIMIT $1
            "#
        )
            .bind(limit).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn has_confirmed_booking(&self, user_id: &str, event_id: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id = $1 AND event_id = $2 AND status = 'confirmed'")
            .bind(user_id).bind(event_id).fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(count > 0)
    }

    async fn confirmed_attendees(&self, event_id: &str) -> Result<Vec<String>, AppError> {
        sqlx::query_scalar("SELECT DISTINCT user_id FROM bookings WHERE event_id = $1 AND status = 'confirmed' ORDER BY user_id")
            .bind(event_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
