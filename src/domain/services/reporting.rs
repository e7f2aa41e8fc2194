use crate::domain::models::{
    booking::{Booking, BookingStatus},
    event::{Event, EventStatus},
    review::Review,
    user::User,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Mean rating rounded to one decimal, 0 when there are no reviews.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: i64 = reviews.iter().map(|r| r.rating).sum();
    let mean = sum as f64 / reviews.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub fn confirmed_revenue(bookings: &[Booking]) -> i64 {
    bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .fold(0i64, |acc, b| acc.saturating_add(b.total_amount))
}

fn count_status(bookings: &[Booking], status: BookingStatus) -> i64 {
    bookings.iter().filter(|b| b.status == status).count() as i64
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeStats {
    pub name: String,
    pub price: i64,
    pub total: i64,
    pub sold: i64,
    pub available: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub total_bookings: i64,
    pub confirmed_bookings: i64,
    pub cancelled_bookings: i64,
    pub total_revenue: i64,
    pub tickets_sold: i64,
    pub available_seats: i64,
    pub average_rating: f64,
    pub total_reviews: i64,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventDashboard {
    pub event: Event,
    pub stats: EventStats,
    pub ticket_type_stats: Vec<TicketTypeStats>,
}

pub fn event_dashboard(event: Event, bookings: &[Booking], reviews: &[Review]) -> EventDashboard {
    let stats = EventStats {
        total_bookings: bookings.len() as i64,
        confirmed_bookings: count_status(bookings, BookingStatus::Confirmed),
        cancelled_bookings: count_status(bookings, BookingStatus::Cancelled),
        total_revenue: confirmed_revenue(bookings),
        tickets_sold: event.tickets_sold(),
        available_seats: event.available_seats,
        average_rating: average_rating(reviews),
        total_reviews: reviews.len() as i64,
    };

    let ticket_type_stats = event
        .ticket_types
        .iter()
        .map(|t| TicketTypeStats {
            name: t.name.clone(),
            price: t.price,
            total: t.quantity,
            sold: t.sold,
            available: t.remaining(),
            revenue: t.sold.saturating_mul(t.price),
        })
        .collect();

    EventDashboard {
        event,
        stats,
        ticket_type_stats,
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerStats {
    pub total_events: i64,
    pub published_events: i64,
    pub upcoming_events: i64,
    pub past_events: i64,
    pub total_bookings: i64,
    pub total_revenue: i64,
    pub total_tickets_sold: i64,
    pub average_rating: f64,
    pub total_reviews: i64,
}

pub fn organizer_stats(events: &[Event], bookings: &[Booking], reviews: &[Review], today: NaiveDate) -> OrganizerStats {
    OrganizerStats {
        total_events: events.len() as i64,
        published_events: events.iter().filter(|e| e.status == EventStatus::Published).count() as i64,
        upcoming_events: events
            .iter()
            .filter(|e| e.status == EventStatus::Published && e.date > today)
            .count() as i64,
        past_events: events.iter().filter(|e| e.date <= today).count() as i64,
        total_bookings: bookings.len() as i64,
        total_revenue: confirmed_revenue(bookings),
        total_tickets_sold: events.iter().fold(0i64, |acc, e| acc.saturating_add(e.tickets_sold())),
        average_rating: average_rating(reviews),
        total_reviews: reviews.len() as i64,
    }
}

/// Per-key counts plus their total, serialized flat: `{"total": 3, "user": 2, ...}`.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Tally {
    pub total: i64,
    #[serde(flatten)]
    pub by_key: BTreeMap<&'static str, i64>,
}

impl Tally {
    /// Every key in `keys` appears, zero when absent from `counts`.
    pub fn new(keys: impl IntoIterator<Item = &'static str>, counts: impl IntoIterator<Item = (&'static str, i64)>) -> Self {
        let mut by_key: BTreeMap<&'static str, i64> = keys.into_iter().map(|k| (k, 0)).collect();
        for (key, count) in counts {
            *by_key.entry(key).or_insert(0) += count;
        }
        Self { total: by_key.values().sum(), by_key }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerOverview {
    pub id: String,
    pub name: String,
    pub email: String,
    pub suspended: bool,
    pub total_events: i64,
    pub published_events: i64,
    pub total_bookings: i64,
    pub total_revenue: i64,
}

pub fn organizer_overview(organizers: &[User], events: &[Event], bookings: &[Booking]) -> Vec<OrganizerOverview> {
    let mut owner_of: HashMap<&str, &str> = HashMap::new();
    for event in events {
        owner_of.insert(event.id.as_str(), event.organizer_id.as_str());
    }

    let mut booking_counts: HashMap<&str, (i64, i64)> = HashMap::new();
    for booking in bookings {
        if let Some(owner) = owner_of.get(booking.event_id.as_str()) {
            let entry = booking_counts.entry(owner).or_insert((0, 0));
            entry.0 += 1;
            if booking.status == BookingStatus::Confirmed {
                entry.1 = entry.1.saturating_add(booking.total_amount);
            }
        }
    }

    organizers
        .iter()
        .map(|org| {
            let own: Vec<&Event> = events.iter().filter(|e| e.organizer_id == org.id).collect();
            let (total_bookings, total_revenue) = booking_counts.get(org.id.as_str()).copied().unwrap_or((0, 0));
            OrganizerOverview {
                id: org.id.clone(),
                name: org.name.clone(),
                email: org.email.clone(),
                suspended: org.suspended,
                total_events: own.len() as i64,
                published_events: own.iter().filter(|e| e.status == EventStatus::Published).count() as i64,
                total_bookings,
                total_revenue,
            }
        })
        .collect()
}
