use crate::domain::{models::review::Review, ports::ReviewRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use chrono::Utc;

pub struct PostgresReviewRepo {
    pool: PgPool,
}

impl PostgresReviewRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepo {
    async fn create(&self, review: &Review) -> Result<Review, AppError> {
        sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (id, event_id, user_id, rating, comment, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *"
        )
            .bind(&review.id)
            .bind(&review.event_id)
            .bind(&review.user_id)
            .bind(review.rating)
            .bind(&review.comment)
            .bind(review.created_at)
            .bind(review.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Review>, AppError> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_user_and_event(&self, user_id: &str, event_id: &str) -> Result<Option<Review>, AppError> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE user_id = $1 AND event_id = $2")
            .bind(user_id).bind(event_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Review>, AppError> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE event_id = $1 ORDER BY created_at DESC")
            .bind(event_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_organizer(&self, organizer_id: &str) -> Result<Vec<Review>, AppError> {
        sqlx::query_as::<_, Review>(
            "SELECT r.* FROM reviews r JOIN events e ON e.id = r.event_id WHERE e.organizer_id = $1 ORDER BY r.created_at DESC"
        )
            .bind(organizer_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_all(&self) -> Result<Vec<Review>, AppError> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews ORDER BY created_at DESC").fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn update(&self, review: &Review) -> Result<Review, AppError> {
        sqlx::query_as::<_, Review>("UPDATE reviews SET rating = $1, comment = $2, updated_at = $3 WHERE id = $4 RETURNING *")
            .bind(review.rating)
            .bind(&review.comment)
            .bind(Utc::now())
            .bind(&review.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Review not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Review not found".into())); }
        Ok(())
    }
}
