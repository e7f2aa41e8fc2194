use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub event_id: String,
    pub organizer_id: String,
    pub title: String,
    pub message: String,
    #[sqlx(skip)]
    pub sent_to: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(event_id: String, organizer_id: String, title: String, message: String, sent_to: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            organizer_id,
            title,
            message,
            sent_to,
            created_at: Utc::now(),
        }
    }
}
