use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use std::str::FromStr;
use rand::{distributions::Alphanumeric, Rng};
use super::user::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(ParseEnumError { kind: "booking status", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = ParseEnumError;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

/// One purchased line. `price` is the unit price at booking time.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingTicket {
    pub ticket_type: String,
    pub quantity: i64,
    pub price: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub tickets: Json<Vec<BookingTicket>>,
    pub total_amount: i64,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub booking_reference: String,
    #[serde(skip_serializing)]
    pub idempotency_key: Option<String>,
    #[serde(skip_serializing)]
    pub request_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

pub struct NewBookingParams {
    pub event_id: String,
    pub user_id: String,
    pub tickets: Vec<BookingTicket>,
    pub total_amount: i64,
    pub idempotency_key: Option<String>,
    pub request_hash: Option<String>,
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: params.event_id,
            user_id: params.user_id,
            tickets: Json(params.tickets),
            total_amount: params.total_amount,
            status: BookingStatus::Confirmed,
            booking_reference: generate_reference(),
            idempotency_key: params.idempotency_key,
            request_hash: params.request_hash,
            created_at: Utc::now(),
            cancelled_at: None,
        }
    }

    pub fn total_tickets(&self) -> i64 {
        self.tickets.iter().map(|t| t.quantity).sum()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }
}

pub fn generate_reference() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("BK-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn reference_is_url_safe() {
        let reference = generate_reference();
        assert!(reference.starts_with("BK-"));
        assert_eq!(reference.len(), 15);
        assert!(reference[3..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn references_do_not_repeat() {
        let refs: HashSet<String> = (0..1000).map(|_| generate_reference()).collect();
        assert_eq!(refs.len(), 1000);
    }

    #[test]
    fn new_booking_is_confirmed() {
        let booking = Booking::new(NewBookingParams {
            event_id: "e".into(),
            user_id: "u".into(),
            tickets: vec![
                BookingTicket { ticket_type: "GA".into(), quantity: 2, price: 50 },
                BookingTicket { ticket_type: "VIP".into(), quantity: 1, price: 120 },
            ],
            total_amount: 220,
            idempotency_key: None,
            request_hash: None,
        });
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.total_tickets(), 3);
        assert!(!booking.is_cancelled());
    }
}
