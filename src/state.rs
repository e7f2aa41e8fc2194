use std::sync::Arc;
use crate::domain::ports::{
    AnnouncementRepository, BookingRepository, EmailService, EventRepository, JobRepository,
    NotificationRepository, ReviewRepository, UserRepository,
};
use crate::domain::services::{auth_service::AuthService, notifier::Notifier};
use crate::config::Config;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub user_repo: Arc<dyn UserRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub review_repo: Arc<dyn ReviewRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub announcement_repo: Arc<dyn AnnouncementRepository>,
    pub job_repo: Arc<dyn JobRepository>,
    pub auth_service: Arc<AuthService>,
    pub email_service: Arc<dyn EmailService>,
    pub notifier: Notifier,
    pub templates: Arc<Tera>,
}
