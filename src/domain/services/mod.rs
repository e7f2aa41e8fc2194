pub mod auth_service;
pub mod calendar;
pub mod email_templates;
pub mod notifier;
pub mod reporting;
pub mod reservation;
