use crate::domain::{models::job::{self, Job}, ports::JobRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use chrono::Utc;

/// Writes outbox rows inside the caller's transaction so they commit with the change that caused them.
pub(crate) async fn enqueue(tx: &mut Transaction<'_, Postgres>, jobs: &[Job]) -> Result<(), AppError> {
    for job in jobs {
        sqlx::query("INSERT INTO jobs (id, job_type, payload, execute_at, status, error_message, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(&job.id).bind(&job.job_type).bind(&job.payload).bind(job.execute_at)
            .bind(&job.status).bind(&job.error_message).bind(job.created_at)
            .execute(&mut **tx).await.map_err(AppError::Database)?;
    }
    Ok(())
}

pub struct PostgresJobRepo {
    pool: PgPool,
}

impl PostgresJobRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn finish(&self, id: &str, status: &str, error: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs SET status = $1, error_message = $2 WHERE id = $3 AND status = $4")
            .bind(status).bind(error).bind(id).bind(job::PROCESSING)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}

#[async_trait]
impl JobRepository for PostgresJobRepo {
    async fn claim_due(&self, limit: i64) -> Result<Vec<Job>, AppError> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = $1
            WHERE id IN (
                SELECT id
                FROM jobs
                WHERE status = $2 AND execute_at <= $3
                ORDER BY execute_at ASC, created_at ASC
                LIMIT $4
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#
        )
            .bind(job::PROCESSING).bind(job::PENDING).bind(Utc::now()).bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn mark_completed(&self, id: &str) -> Result<(), AppError> {
        self.finish(id, job::COMPLETED, None).await
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), AppError> {
        self.finish(id, job::FAILED, Some(error)).await
    }

    async fn requeue_stalled(&self) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE jobs SET status = $1 WHERE status = $2")
            .bind(job::PENDING).bind(job::PROCESSING)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
