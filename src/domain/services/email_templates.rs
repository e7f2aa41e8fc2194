use tera::Tera;

pub const BOOKING_CONFIRMATION_TEMPLATE: &str = "booking_confirmation.html";
pub const BOOKING_CANCELLATION_TEMPLATE: &str = "booking_cancellation.html";
pub const ANNOUNCEMENT_TEMPLATE: &str = "announcement.html";

pub fn load_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (BOOKING_CONFIRMATION_TEMPLATE, include_str!("../../templates/booking_confirmation.html")),
        (BOOKING_CANCELLATION_TEMPLATE, include_str!("../../templates/booking_cancellation.html")),
        (ANNOUNCEMENT_TEMPLATE, include_str!("../../templates/announcement.html")),
    ])?;
    Ok(tera)
}

pub fn confirmation_subject(event_title: &str) -> String {
    format!("Booking Confirmed: {}", event_title)
}

pub fn cancellation_subject(event_title: &str) -> String {
    format!("Booking Cancelled: {}", event_title)
}

pub fn announcement_subject(event_title: &str, title: &str) -> String {
    format!("{}: {}", event_title, title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera::Context;

    #[test]
    fn bundled_templates_render() {
        let tera = load_templates().unwrap();

        let mut ctx = Context::new();
        ctx.insert("user_name", "Ada");
        ctx.insert("event_title", "Expo");
        ctx.insert("booking_reference", "BK-ABCDEF123456");
        ctx.insert("tickets", &serde_json::json!([{ "ticketType": "GA", "quantity": 2, "price": 50 }]));
        ctx.insert("total_amount", &100);
        ctx.insert("event_date", "2031-01-01");
        ctx.insert("event_time", "10:00");
        ctx.insert("venue", "Hall");
        ctx.insert("city", "Oslo");
        ctx.insert("booking_link", "http://localhost/bookings/1");
        let html = tera.render(BOOKING_CONFIRMATION_TEMPLATE, &ctx).unwrap();
        assert!(html.contains("BK-ABCDEF123456"));
        assert!(html.contains("GA"));

        ctx.insert("events_link", "http://localhost/events");
        let html = tera.render(BOOKING_CANCELLATION_TEMPLATE, &ctx).unwrap();
        assert!(html.contains("cancelled"));

        ctx.insert("title", "Doors at 9");
        ctx.insert("message", "Bring ID");
        ctx.insert("event_link", "http://localhost/events/1");
        let html = tera.render(ANNOUNCEMENT_TEMPLATE, &ctx).unwrap();
        assert!(html.contains("Bring ID"));
    }
}
