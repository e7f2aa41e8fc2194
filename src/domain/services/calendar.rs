use crate::domain::models::{booking::Booking, event::Event};
use chrono::{Duration, NaiveTime};
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike};

const DEFAULT_DURATION_HOURS: i64 = 2;

/// Generates an iCalendar (.ics) string for a booking. Events without a parseable
/// `HH:MM` start become all-day entries.
pub fn generate_ics(event: &Event, booking: &Booking) -> String {
    let place = format!(
        "{}, {}, {}, {}",
        event.location.venue, event.location.address, event.location.city, event.location.country
    );

    let mut ical_event = IcalEvent::new();
    ical_event
        .summary(&event.title)
        .description(&format!("Booking {}\n{}", booking.booking_reference, event.description))
        .location(&place)
        .uid(&booking.id);

    match NaiveTime::parse_from_str(&event.time, "%H:%M") {
        Ok(time) => {
            let start = event.date.and_time(time);
            ical_event.starts(start).ends(start + Duration::hours(DEFAULT_DURATION_HOURS));
        }
        Err(_) => {
            ical_event.all_day(event.date);
        }
    }

    let mut calendar = Calendar::new();
    calendar.push(ical_event.done());
    calendar.to_string()
}
