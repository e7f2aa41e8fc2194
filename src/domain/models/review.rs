use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(event_id: String, user_id: String, rating: i64, comment: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            user_id,
            rating,
            comment,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn rating_in_range(rating: i64) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}
