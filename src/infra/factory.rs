use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;
use tera::Tera;

use crate::config::Config;
use crate::error::StartupError;
use crate::state::AppState;
use crate::domain::ports::{EmailService, NotificationRepository};
use crate::domain::services::{auth_service::AuthService, email_templates::load_templates, notifier::Notifier};
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::repositories::{
    postgres_announcement_repo::PostgresAnnouncementRepo, postgres_booking_repo::PostgresBookingRepo,
    postgres_event_repo::PostgresEventRepo, postgres_job_repo::PostgresJobRepo,
    postgres_notification_repo::PostgresNotificationRepo, postgres_review_repo::PostgresReviewRepo,
    postgres_user_repo::PostgresUserRepo,
    sqlite_announcement_repo::SqliteAnnouncementRepo, sqlite_booking_repo::SqliteBookingRepo,
    sqlite_event_repo::SqliteEventRepo, sqlite_job_repo::SqliteJobRepo,
    sqlite_notification_repo::SqliteNotificationRepo, sqlite_review_repo::SqliteReviewRepo,
    sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> Result<AppState, StartupError> {
    let email_service = Arc::new(
        HttpEmailService::new(config.mail_service_url.clone(), config.mail_service_token.clone())
            .map_err(StartupError::MailClient)?,
    );
    let templates = Arc::new(load_templates()?);

    if config.is_postgres() {
        info!("Initializing PostgreSQL connection...");

        let opts = PgConnectOptions::from_str(&config.database_url)?
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await?;

        run_postgres_migrations(&pool).await?;
        Ok(postgres_state(config, pool, email_service, templates))
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        run_sqlite_migrations(&pool).await?;
        Ok(sqlite_state(config, pool, email_service, templates))
    }
}

pub fn postgres_state(config: &Config, pool: PgPool, email_service: Arc<dyn EmailService>, templates: Arc<Tera>) -> AppState {
    let notification_repo: Arc<dyn NotificationRepository> = Arc::new(PostgresNotificationRepo::new(pool.clone()));
    AppState {
        config: config.clone(),
        user_repo: Arc::new(PostgresUserRepo::new(pool.clone())),
        event_repo: Arc::new(PostgresEventRepo::new(pool.clone())),
        booking_repo: Arc::new(PostgresBookingRepo::new(pool.clone())),
        review_repo: Arc::new(PostgresReviewRepo::new(pool.clone())),
        announcement_repo: Arc::new(PostgresAnnouncementRepo::new(pool.clone())),
        job_repo: Arc::new(PostgresJobRepo::new(pool)),
        notifier: Notifier::new(notification_repo.clone()),
        notification_repo,
        auth_service: Arc::new(AuthService::new(config)),
        email_service,
        templates,
    }
}

pub fn sqlite_state(config: &Config, pool: SqlitePool, email_service: Arc<dyn EmailService>, templates: Arc<Tera>) -> AppState {
    let notification_repo: Arc<dyn NotificationRepository> = Arc::new(SqliteNotificationRepo::new(pool.clone()));
    AppState {
        config: config.clone(),
        user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
        event_repo: Arc::new(SqliteEventRepo::new(pool.clone())),
        booking_repo: Arc::new(SqliteBookingRepo::new(pool.clone())),
        review_repo: Arc::new(SqliteReviewRepo::new(pool.clone())),
        announcement_repo: Arc::new(SqliteAnnouncementRepo::new(pool.clone())),
        job_repo: Arc::new(SqliteJobRepo::new(pool)),
        notifier: Notifier::new(notification_repo.clone()),
        notification_repo,
        auth_service: Arc::new(AuthService::new(config)),
        email_service,
        templates,
    }
}

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<(), StartupError> {
    sqlx::migrate!("./migrations/postgres").run(pool).await?;
    Ok(())
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), StartupError> {
    sqlx::migrate!("./migrations/sqlite").run(pool).await?;
    Ok(())
}
