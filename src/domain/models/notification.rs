use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use super::user::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Booking,
    EventUpdate,
    EventReminder,
    Cancellation,
    Review,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Booking => "booking",
            NotificationType::EventUpdate => "event_update",
            NotificationType::EventReminder => "event_reminder",
            NotificationType::Cancellation => "cancellation",
            NotificationType::Review => "review",
        }
    }
}

impl FromStr for NotificationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking" => Ok(NotificationType::Booking),
            "event_update" => Ok(NotificationType::EventUpdate),
            "event_reminder" => Ok(NotificationType::EventReminder),
            "cancellation" => Ok(NotificationType::Cancellation),
            "review" => Ok(NotificationType::Review),
            other => Err(ParseEnumError { kind: "notification type", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for NotificationType {
    type Error = ParseEnumError;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_event: Option<String>,
    pub related_booking: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// What a workflow hands to the emitter.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_event: Option<String>,
    pub related_booking: Option<String>,
}

impl NewNotification {
    pub fn new(user_id: impl Into<String>, kind: NotificationType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            title: title.into(),
            message: message.into(),
            related_event: None,
            related_booking: None,
        }
    }

    pub fn for_event(mut self, event_id: impl Into<String>) -> Self {
        self.related_event = Some(event_id.into());
        self
    }

    pub fn for_booking(mut self, booking_id: impl Into<String>) -> Self {
        self.related_booking = Some(booking_id.into());
        self
    }

    pub fn into_record(self) -> Notification {
        Notification {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            related_event: self.related_event,
            related_booking: self.related_booking,
            read: false,
            created_at: Utc::now(),
        }
    }
}
