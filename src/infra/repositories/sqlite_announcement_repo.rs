use crate::domain::{models::{announcement::Announcement, job::Job}, ports::AnnouncementRepository};
use crate::error::AppError;
use crate::infra::repositories::sqlite_job_repo;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteAnnouncementRepo {
    pool: SqlitePool,
}

impl SqliteAnnouncementRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }

    async fn load_recipients(&self, announcement: &mut Announcement) -> Result<(), AppError> {
        announcement.sent_to = sqlx::query_scalar("SELECT user_id FROM announcement_recipients WHERE announcement_id = ? ORDER BY user_id")
            .bind(&announcement.id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}

#[async_trait]
impl AnnouncementRepository for SqliteAnnouncementRepo {
    async fn create(&self, announcement: &Announcement, jobs: &[Job]) -> Result<Announcement, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        sqlx::query("INSERT INTO announcements (id, event_id, organizer_id, title, message, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(&announcement.id).bind(&announcement.event_id).bind(&announcement.organizer_id)
            .bind(&announcement.title).bind(&announcement.message).bind(announcement.created_at)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        for user_id in &announcement.sent_to {
            sqlx::query("INSERT INTO announcement_recipients (announcement_id, user_id) VALUES (?, ?)")
                .bind(&announcement.id).bind(user_id).execute(&mut *tx).await.map_err(AppError::Database)?;
        }
        sqlite_job_repo::enqueue(&mut tx, jobs).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(announcement.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Announcement>, AppError> {
        let found = sqlx::query_as::<_, Announcement>("SELECT * FROM announcements WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)?;
        match found {
            Some(mut announcement) => {
                self.load_recipients(&mut announcement).await?;
                Ok(Some(announcement))
            }
            None => Ok(None),
        }
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Announcement>, AppError> {
        let mut announcements = sqlx::query_as::<_, Announcement>("SELECT * FROM announcements WHERE event_id = ? ORDER BY created_at DESC")
            .bind(event_id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
        for announcement in announcements.iter_mut() {
            self.load_recipients(announcement).await?;
        }
        Ok(announcements)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?").bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 { return Err(AppError::NotFound("Announcement not found".into())); }
        Ok(())
    }
}
