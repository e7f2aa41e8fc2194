use crate::domain::models::event::{Category, EventStatus, Location, TicketType, MAX_EVENT_GROSS, MAX_EVENT_SEATS};
use crate::domain::models::user::Role;
use crate::domain::services::reservation::TicketRequest;
use crate::error::AppError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct TicketTypeRequest {
    pub name: String,
    pub price: i64,
    pub quantity: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub date: NaiveDate,
    pub time: String,
    pub location: Location,
    pub image: Option<String>,
    pub ticket_types: Vec<TicketTypeRequest>,
    pub total_seats: i64,
    pub status: Option<EventStatus>,
}

impl EventRequest {
    /// Checks the requested layout and returns it with every `sold` counter at zero.
    /// Edits carry the stored counters over inside the repository transaction.
    pub fn validated_ticket_types(&self) -> Result<Vec<TicketType>, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidRequest("Title is required".into()));
        }
        if self.total_seats < 0 {
            return Err(AppError::InvalidRequest("totalSeats cannot be negative".into()));
        }
        if self.total_seats > MAX_EVENT_SEATS {
            return Err(AppError::InvalidRequest(format!("totalSeats cannot exceed {}", MAX_EVENT_SEATS)));
        }

        let mut seen = HashSet::new();
        let mut tiers = Vec::with_capacity(self.ticket_types.len());
        for tier in &self.ticket_types {
            let name = tier.name.trim();
            if name.is_empty() {
                return Err(AppError::InvalidRequest("Ticket type name is required".into()));
            }
            if !seen.insert(name.to_string()) {
                return Err(AppError::InvalidRequest(format!("Duplicate ticket type {}", name)));
            }
            if tier.price < 0 || tier.quantity < 0 {
                return Err(AppError::InvalidRequest(format!(
                    "Ticket type {} needs a non-negative price and quantity",
                    name
                )));
            }
            tiers.push(TicketType { name: name.to_string(), price: tier.price, quantity: tier.quantity, sold: 0 });
        }

        let gross = tiers
            .iter()
            .try_fold(0i64, |acc, t| t.gross().and_then(|g| acc.checked_add(g)))
            .filter(|g| *g <= MAX_EVENT_GROSS);
        if gross.is_none() {
            return Err(AppError::InvalidRequest(format!(
                "Ticket prices times quantities cannot exceed {} in total",
                MAX_EVENT_GROSS
            )));
        }
        Ok(tiers)
    }
}

#[derive(Deserialize, Default)]
pub struct EventQuery {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub status: Option<EventStatus>,
}

#[derive(Deserialize, Default)]
pub struct AdminEventsQuery {
    pub status: Option<EventStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub event_id: String,
    pub tickets: Vec<TicketRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub event_id: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    pub event_id: String,
    pub title: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Deserialize, Default)]
pub struct RejectEventRequest {
    pub reason: Option<String>,
}
