use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;
use super::user::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Music,
    Sports,
    Conference,
    Workshop,
    Festival,
    Theater,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Music => "Music",
            Category::Sports => "Sports",
            Category::Conference => "Conference",
            Category::Workshop => "Workshop",
            Category::Festival => "Festival",
            Category::Theater => "Theater",
            Category::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Music" => Ok(Category::Music),
            "Sports" => Ok(Category::Sports),
            "Conference" => Ok(Category::Conference),
            "Workshop" => Ok(Category::Workshop),
            "Festival" => Ok(Category::Festival),
            "Theater" => Ok(Category::Theater),
            "Other" => Ok(Category::Other),
            other => Err(ParseEnumError { kind: "category", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = ParseEnumError;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub const ALL: [EventStatus; 4] = [EventStatus::Draft, EventStatus::Published, EventStatus::Cancelled, EventStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }

    pub fn is_bookable(&self) -> bool {
        matches!(self, EventStatus::Published)
    }
}

impl FromStr for EventStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "cancelled" => Ok(EventStatus::Cancelled),
            "completed" => Ok(EventStatus::Completed),
            other => Err(ParseEnumError { kind: "event status", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for EventStatus {
    type Error = ParseEnumError;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, Eq)]
pub struct Location {
    pub venue: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, Eq)]
pub struct TicketType {
    pub name: String,
    pub price: i64,
    pub quantity: i64,
    pub sold: i64,
}

/// Upper bound on what one event can take in, in minor units, when every ticket sells.
/// Keeps revenue sums across events well inside `i64`.
pub const MAX_EVENT_GROSS: i64 = 1_000_000_000_000_000;
pub const MAX_EVENT_SEATS: i64 = 1_000_000_000;

impl TicketType {
    pub fn remaining(&self) -> i64 {
        self.quantity - self.sold
    }

    /// `price * quantity`, `None` on overflow.
    pub fn gross(&self) -> Option<i64> {
        self.price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: Category,
    pub date: NaiveDate,
    pub time: String,
    #[sqlx(flatten)]
    pub location: Location,
    pub image: String,
    pub organizer_id: String,
    #[sqlx(skip)]
    pub ticket_types: Vec<TicketType>,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    pub total_seats: i64,
    pub available_seats: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_IMAGE: &str = "https://via.placeholder.com/600x400";

pub struct NewEventParams {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub date: NaiveDate,
    pub time: String,
    pub location: Location,
    pub image: Option<String>,
    pub organizer_id: String,
    pub ticket_types: Vec<TicketType>,
    pub status: EventStatus,
    pub total_seats: i64,
}

impl Event {
    pub fn new(params: NewEventParams) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: params.title,
            description: params.description,
            category: params.category,
            date: params.date,
            time: params.time,
            location: params.location,
            image: params.image.unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            organizer_id: params.organizer_id,
            ticket_types: params.ticket_types,
            status: params.status,
            total_seats: params.total_seats,
            available_seats: params.total_seats,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ticket_type(&self, name: &str) -> Option<&TicketType> {
        self.ticket_types.iter().find(|t| t.name == name)
    }

    pub fn total_sold(&self) -> i64 {
        self.ticket_types.iter().map(|t| t.sold).sum()
    }

    pub fn tickets_sold(&self) -> i64 {
        self.total_seats - self.available_seats
    }

    /// `availableSeats == totalSeats - Σ sold` and `0 <= sold <= quantity` for every tier.
    pub fn ledger_is_consistent(&self) -> bool {
        self.available_seats == self.total_seats - self.total_sold()
            && self.ticket_types.iter().all(|t| t.sold >= 0 && t.sold <= t.quantity)
    }
}

/// Public projection embedded in booking responses.
#[derive(Debug, Serialize, Clone)]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: Location,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            date: event.date,
            time: event.time.clone(),
            location: event.location.clone(),
        }
    }
}

/// Filters accepted by the public event listing.
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub status: Option<EventStatus>,
    pub organizer_id: Option<String>,
}
