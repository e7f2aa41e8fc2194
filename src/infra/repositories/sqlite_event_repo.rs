use crate::domain::{
    models::event::{Event, EventFilter, EventStatus, TicketType},
    ports::EventRepository,
};
use crate::error::AppError;
use crate::infra::repositories::{attach_ticket_types, with_write_retry, TicketTypeRow};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use chrono::Utc;
use std::collections::HashMap;

pub struct SqliteEventRepo {
    pool: SqlitePool,
}

impl SqliteEventRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_ticket_types(&self, events: &mut [Event]) -> Result<(), AppError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT event_id, name, price, quantity, sold FROM ticket_types WHERE event_id IN (",
        );
        let mut ids = qb.separated(", ");
        for event in events.iter() {
            ids.push_bind(event.id.clone());
        }
        qb.push(") ORDER BY event_id, position");
        let rows = qb.build_query_as::<TicketTypeRow>().fetch_all(&self.pool).await.map_err(AppError::Database)?;
        attach_ticket_types(events, rows);
        Ok(())
    }

    async fn list_ordered(&self, filter: &EventFilter, order_by: &str) -> Result<Vec<Event>, AppError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM events WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(organizer_id) = &filter.organizer_id {
            qb.push(" AND organizer_id = ").push_bind(organizer_id.clone());
        }
        if let Some(search) = &filter.search {
            // LIKE is case-insensitive for ASCII in SQLite
            qb.push(" AND title LIKE ").push_bind(format!("%{}%", search));
        }
        qb.push(" ORDER BY ").push(order_by);

        let mut events = qb.build_query_as::<Event>().fetch_all(&self.pool).await.map_err(AppError::Database)?;
        self.load_ticket_types(&mut events).await?;
        Ok(events)
    }

    async fn try_update(&self, event: &Event) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Write first so the ledger checks below run under the writer lock.
        let result = sqlx::query(
            "UPDATE events SET title = ?, description = ?, category = ?, date = ?, time = ?, venue = ?, address = ?, city = ?, country = ?, image = ?, updated_at = ? WHERE id = ?"
        )
            .bind(&event.title).bind(&event.description).bind(event.category.as_str()).bind(event.date).bind(&event.time)
            .bind(&event.location.venue).bind(&event.location.address).bind(&event.location.city).bind(&event.location.country)
            .bind(&event.image).bind(Utc::now()).bind(&event.id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".into()));
        }

        let stored: Vec<TicketType> = sqlx::query_as::<_, TicketType>("SELECT name, price, quantity, sold FROM ticket_types WHERE event_id = ?")
            .bind(&event.id).fetch_all(&mut *tx).await.map_err(AppError::Database)?;
        let stored: HashMap<String, TicketType> = stored.into_iter().map(|t| (t.name.clone(), t)).collect();

        for (name, tier) in &stored {
            if event.ticket_type(name).is_none() {
                if tier.sold > 0 {
                    return Err(AppError::Conflict(format!("Ticket type {} has sold tickets and cannot be removed", name)));
                }
                sqlx::query("DELETE FROM ticket_types WHERE event_id = ? AND name = ?")
                    .bind(&event.id).bind(name).execute(&mut *tx).await.map_err(AppError::Database)?;
            }
        }

        for (position, tier) in event.ticket_types.iter().enumerate() {
            if stored.contains_key(&tier.name) {
                let result = sqlx::query(
                    "UPDATE ticket_types SET price = ?, quantity = ?, position = ? WHERE event_id = ? AND name = ? AND sold <= ?"
                )
                    .bind(tier.price).bind(tier.quantity).bind(position as i64).bind(&event.id).bind(&tier.name).bind(tier.quantity)
                    .execute(&mut *tx).await.map_err(AppError::Database)?;
                if result.rows_affected() == 0 {
                    return Err(AppError::Conflict(format!("Quantity for {} cannot go below tickets already sold", tier.name)));
                }
            } else {
                sqlx::query("INSERT INTO ticket_types (event_id, name, position, price, quantity, sold) VALUES (?, ?, ?, ?, ?, 0)")
                    .bind(&event.id).bind(&tier.name).bind(position as i64).bind(tier.price).bind(tier.quantity)
                    .execute(&mut *tx).await.map_err(AppError::Database)?;
            }
        }

        let sold: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(sold), 0) FROM ticket_types WHERE event_id = ?")
            .bind(&event.id).fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        if event.total_seats < sold {
            return Err(AppError::Conflict(format!("Total seats cannot be lower than the {} tickets already sold", sold)));
        }

        sqlx::query("UPDATE events SET total_seats = ?, available_seats = ? WHERE id = ?")
            .bind(event.total_seats).bind(event.total_seats - sold).bind(&event.id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        sqlx::query(
            "INSERT INTO events (id, title, description, category, date, time, venue, address, city, country, image, organizer_id, status, total_seats, available_seats, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
            .bind(&event.id).bind(&event.title).bind(&event.description).bind(event.category.as_str()).bind(event.date).bind(&event.time)
            .bind(&event.location.venue).bind(&event.location.address).bind(&event.location.city).bind(&event.location.country)
            .bind(&event.image).bind(&event.organizer_id).bind(event.status.as_str()).bind(event.total_seats).bind(event.available_seats)
            .bind(event.created_at).bind(event.updated_at)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        for (position, tier) in event.ticket_types.iter().enumerate() {
            sqlx::query("INSERT INTO ticket_types (event_id, name, position, price, quantity, sold) VALUES (?, ?, ?, ?, ?, ?)")
                .bind(&event.id).bind(&tier.name).bind(position as i64).bind(tier.price).bind(tier.quantity).bind(tier.sold)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(event.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)?;
        match event {
            Some(mut event) => {
                event.ticket_types = sqlx::query_as::<_, TicketType>(
                    "SELECT name, price, quantity, sold FROM ticket_types WHERE event_id = ? ORDER BY position"
                )
                    .bind(id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, AppError> {
        self.list_ordered(filter, "date ASC, time ASC").await
    }

    async fn list_recent(&self, filter: &EventFilter) -> Result<Vec<Event>, AppError> {
        self.list_ordered(filter, "created_at DESC").await
    }

    async fn update(&self, event: &Event) -> Result<Event, AppError> {
        with_write_retry(|| self.try_update(event)).await?;
        self.find_by_id(&event.id).await?.ok_or_else(|| AppError::NotFound("Event not found".into()))
    }

    async fn set_status(&self, id: &str, status: EventStatus) -> Result<Option<Event>, AppError> {
        let result = sqlx::query("UPDATE events SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str()).bind(Utc::now()).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Event not found".into())); }
        Ok(())
    }

    async fn count_by_status(&self) -> Result<Vec<(EventStatus, i64)>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM events GROUP BY status")
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;
        rows.into_iter()
            .map(|(status, count)| {
                status.parse::<EventStatus>()
                    .map(|s| (s, count))
                    .map_err(|e| AppError::InternalWithMsg(e.to_string()))
            })
            .collect()
    }
}
