use crate::domain::models::{booking::BookingTicket, event::Event};
use crate::error::{AppError, Shortfall};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One line of a booking request as the client sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub ticket_type: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationPlan {
    pub lines: Vec<BookingTicket>,
    pub total_amount: i64,
    pub total_tickets: i64,
}

/// Merges duplicate lines and orders them by ticket type name.
/// Every quantity must be positive.
pub fn normalize_request(requested: &[TicketRequest]) -> Result<Vec<(String, i64)>, AppError> {
    if requested.is_empty() {
        return Err(AppError::InvalidRequest("At least one ticket is required".into()));
    }

    let mut merged: BTreeMap<String, i64> = BTreeMap::new();
    for line in requested {
        if line.quantity <= 0 {
            return Err(AppError::InvalidRequest(format!(
                "Quantity for {} must be greater than zero",
                line.ticket_type
            )));
        }
        let entry = merged.entry(line.ticket_type.clone()).or_insert(0);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or_else(|| AppError::InvalidRequest("Quantity is too large".into()))?;
    }

    Ok(merged.into_iter().collect())
}

/// Checks a normalized selection against the event ledger as it was read and
/// prices it. The store re-checks every condition when the plan is committed.
pub fn plan_reservation(event: &Event, selection: &[(String, i64)]) -> Result<ReservationPlan, AppError> {
    if !event.status.is_bookable() {
        return Err(AppError::InvalidRequest("Event is not available for booking".into()));
    }

    let mut lines = Vec::with_capacity(selection.len());
    let mut total_amount: i64 = 0;
    let mut total_tickets: i64 = 0;

    for (name, quantity) in selection {
        let tier = event
            .ticket_type(name)
            .ok_or_else(|| AppError::InvalidRequest(format!("Ticket type {} not found", name)))?;

        if tier.remaining() < *quantity {
            return Err(AppError::InsufficientInventory(Shortfall::TicketType {
                ticket_type: name.clone(),
                requested: *quantity,
                available: tier.remaining(),
            }));
        }

        let line_amount = tier
            .price
            .checked_mul(*quantity)
            .ok_or_else(|| AppError::InvalidRequest("Booking total is too large".into()))?;
        total_amount = total_amount
            .checked_add(line_amount)
            .ok_or_else(|| AppError::InvalidRequest("Booking total is too large".into()))?;
        total_tickets += quantity;

        lines.push(BookingTicket {
            ticket_type: name.clone(),
            quantity: *quantity,
            price: tier.price,
        });
    }

    if event.available_seats < total_tickets {
        return Err(AppError::InsufficientInventory(Shortfall::Seats {
            requested: total_tickets,
            available: event.available_seats,
        }));
    }

    Ok(ReservationPlan { lines, total_amount, total_tickets })
}

/// SHA-256 over the event and the normalized selection, hex encoded.
pub fn request_fingerprint(event_id: &str, selection: &[(String, i64)]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event_id.as_bytes());
    for (name, quantity) in selection {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(quantity.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::event::{Category, EventStatus, Location, NewEventParams, TicketType};
    use chrono::NaiveDate;

    fn event_with(tiers: Vec<TicketType>, seats: i64) -> Event {
        let mut event = Event::new(NewEventParams {
            title: "Show".into(),
            description: "".into(),
            category: Category::Theater,
            date: NaiveDate::from_ymd_opt(2031, 1, 1).unwrap(),
            time: "19:30".into(),
            location: Location { venue: "V".into(), address: "A".into(), city: "C".into(), country: "X".into() },
            image: None,
            organizer_id: "org".into(),
            ticket_types: tiers,
            status: EventStatus::Published,
            total_seats: seats,
        });
        event.available_seats = seats - event.total_sold();
        event
    }

    fn ga(sold: i64) -> TicketType {
        TicketType { name: "GA".into(), price: 50, quantity: 10, sold }
    }

    fn req(name: &str, quantity: i64) -> TicketRequest {
        TicketRequest { ticket_type: name.into(), quantity }
    }

    #[test]
    fn prices_a_simple_request() {
        let event = event_with(vec![ga(0)], 10);
        let selection = normalize_request(&[req("GA", 3)]).unwrap();
        let plan = plan_reservation(&event, &selection).unwrap();
        assert_eq!(plan.total_amount, 150);
        assert_eq!(plan.total_tickets, 3);
        assert_eq!(plan.lines[0].price, 50);
    }

    #[test]
    fn rejects_more_than_remaining_of_a_type() {
        let event = event_with(vec![ga(3)], 10);
        let selection = normalize_request(&[req("GA", 8)]).unwrap();
        match plan_reservation(&event, &selection) {
            Err(AppError::InsufficientInventory(Shortfall::TicketType { requested, available, .. })) => {
                assert_eq!(requested, 8);
                assert_eq!(available, 7);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_type_by_name() {
        let event = event_with(vec![ga(0)], 10);
        let selection = normalize_request(&[req("Balcony", 1)]).unwrap();
        match plan_reservation(&event, &selection) {
            Err(AppError::InvalidRequest(msg)) => assert!(msg.contains("Balcony")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn seat_cap_applies_across_types() {
        let vip = TicketType { name: "VIP".into(), price: 120, quantity: 10, sold: 0 };
        let event = event_with(vec![ga(0), vip], 5);
        let selection = normalize_request(&[req("GA", 3), req("VIP", 3)]).unwrap();
        match plan_reservation(&event, &selection) {
            Err(AppError::InsufficientInventory(Shortfall::Seats { requested, available })) => {
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn duplicate_lines_are_merged_before_checking() {
        let selection = normalize_request(&[req("GA", 4), req("GA", 4)]).unwrap();
        assert_eq!(selection, vec![("GA".to_string(), 8)]);

        let event = event_with(vec![ga(3)], 10);
        assert!(matches!(
            plan_reservation(&event, &selection),
            Err(AppError::InsufficientInventory(_))
        ));
    }

    #[test]
    fn empty_and_zero_quantity_are_invalid() {
        assert!(matches!(normalize_request(&[]), Err(AppError::InvalidRequest(_))));
        assert!(matches!(normalize_request(&[req("GA", 0)]), Err(AppError::InvalidRequest(_))));
        assert!(matches!(normalize_request(&[req("GA", -2)]), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn unpublished_event_cannot_be_booked() {
        let mut event = event_with(vec![ga(0)], 10);
        event.status = EventStatus::Draft;
        let selection = normalize_request(&[req("GA", 1)]).unwrap();
        assert!(matches!(plan_reservation(&event, &selection), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn fingerprint_ignores_line_order_and_splitting() {
        let a = normalize_request(&[req("VIP", 1), req("GA", 2)]).unwrap();
        let b = normalize_request(&[req("GA", 1), req("VIP", 1), req("GA", 1)]).unwrap();
        assert_eq!(request_fingerprint("e1", &a), request_fingerprint("e1", &b));
        assert_ne!(request_fingerprint("e1", &a), request_fingerprint("e2", &a));

        let c = normalize_request(&[req("GA", 3)]).unwrap();
        assert_ne!(request_fingerprint("e1", &a), request_fingerprint("e1", &c));
    }
}
