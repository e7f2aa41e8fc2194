use std::sync::Arc;
use crate::domain::{models::notification::NewNotification, ports::NotificationRepository};
use tokio::task::JoinHandle;
use tracing::{error, debug, info_span, Instrument};

/// Persists in-app notifications off the request path. Failures are logged, never returned.
#[derive(Clone)]
pub struct Notifier {
    repo: Arc<dyn NotificationRepository>,
}

impl Notifier {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    pub fn emit(&self, notification: NewNotification) -> JoinHandle<()> {
        let repo = self.repo.clone();
        let span = info_span!(
            "notification",
            user_id = %notification.user_id,
            kind = notification.kind.as_str()
        );

        tokio::spawn(
            async move {
                let record = notification.into_record();
                match repo.create(&record).await {
                    Ok(_) => debug!("Notification {} stored", record.id),
                    Err(e) => error!("Failed to store notification: {:?}", e),
                }
            }
            .instrument(span),
        )
    }

    pub fn emit_all(&self, notifications: impl IntoIterator<Item = NewNotification>) {
        for notification in notifications {
            self.emit(notification);
        }
    }
}
