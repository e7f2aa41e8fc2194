use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const BOOKING_CONFIRMATION: &str = "BOOKING_CONFIRMATION";
pub const BOOKING_CANCELLATION: &str = "BOOKING_CANCELLATION";
pub const ANNOUNCEMENT: &str = "ANNOUNCEMENT";

pub const PENDING: &str = "PENDING";
pub const PROCESSING: &str = "PROCESSING";
pub const COMPLETED: &str = "COMPLETED";
pub const FAILED: &str = "FAILED";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct JobPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Job {
    pub id: String,
    pub job_type: String, // BOOKING_CONFIRMATION, BOOKING_CANCELLATION or ANNOUNCEMENT
    pub payload: Json<JobPayload>,
    pub execute_at: DateTime<Utc>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_type: &str, payload: JobPayload, execute_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            payload: Json(payload),
            execute_at,
            status: PENDING.to_string(),
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn booking_confirmation(booking_id: &str, user_id: &str) -> Self {
        Self::new(BOOKING_CONFIRMATION, JobPayload {
            user_id: user_id.to_string(),
            booking_id: Some(booking_id.to_string()),
            announcement_id: None,
        }, Utc::now())
    }

    pub fn booking_cancellation(booking_id: &str, user_id: &str) -> Self {
        Self::new(BOOKING_CANCELLATION, JobPayload {
            user_id: user_id.to_string(),
            booking_id: Some(booking_id.to_string()),
            announcement_id: None,
        }, Utc::now())
    }

    pub fn announcement(announcement_id: &str, user_id: &str) -> Self {
        Self::new(ANNOUNCEMENT, JobPayload {
            user_id: user_id.to_string(),
            booking_id: None,
            announcement_id: Some(announcement_id.to_string()),
        }, Utc::now())
    }
}
