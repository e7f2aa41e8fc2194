mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_review_requires_confirmed_booking() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(10, 10, 10).await;
    let visitor = app.register("Visitor", "user").await;
    let review = json!({ "eventId": event_id, "rating": 5, "comment": "Loved it" });

    let (status, body) = app.post("/api/v1/reviews", Some(&visitor.token), review.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only review events you have attended");

    // A cancelled booking does not count as attendance.
    let (_, booking) = app.book(&visitor.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    app.delete(&format!("/api/v1/bookings/{}", booking["id"].as_str().unwrap()), Some(&visitor.token)).await;
    let (status, _) = app.post("/api/v1/reviews", Some(&visitor.token), review.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.book(&visitor.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    let (status, body) = app.post("/api/v1/reviews", Some(&visitor.token), review.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["rating"], 5);
    assert_eq!(body["user"]["name"], "Visitor");

    let (status, body) = app.post("/api/v1/reviews", Some(&visitor.token), review).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You have already reviewed this event");
}

#[tokio::test]
async fn test_review_rating_bounds_and_missing_event() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(10, 10, 10).await;
    let fan = app.register("Fan", "user").await;
    app.book(&fan.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;

    for rating in [0, 6, -1] {
        let (status, _) = app.post("/api/v1/reviews", Some(&fan.token), json!({ "eventId": event_id, "rating": rating })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "rating {} accepted", rating);
    }

    let (status, _) = app.post("/api/v1/reviews", Some(&fan.token), json!({ "eventId": "missing", "rating": 3 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_listing_edit_and_delete() {
    let app = TestApp::new().await;
    let (organizer, event_id) = app.ga_event(10, 10, 10).await;
    let fan = app.register("Fan", "user").await;
    let critic = app.register("Critic", "user").await;
    let admin = app.create_admin().await;

    for user in [&fan, &critic] {
        app.book(&user.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    }
    let (_, praise) = app.post("/api/v1/reviews", Some(&fan.token), json!({ "eventId": event_id, "rating": 5 })).await;
    let (_, pan) = app.post("/api/v1/reviews", Some(&critic.token), json!({ "eventId": event_id, "rating": 2, "comment": "Too loud" })).await;

    let (status, list) = app.get(&format!("/api/v1/reviews/event/{}", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["totalReviews"], 2);
    assert_eq!(list["avgRating"], 3.5);

    let praise_uri = format!("/api/v1/reviews/{}", praise["id"].as_str().unwrap());
    let pan_uri = format!("/api/v1/reviews/{}", pan["id"].as_str().unwrap());

    let (status, _) = app.put(&praise_uri, Some(&critic.token), Some(json!({ "rating": 1 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.put(&praise_uri, Some(&fan.token), Some(json!({ "rating": 9 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app.put(&praise_uri, Some(&fan.token), Some(json!({ "rating": 4, "comment": " Still good " }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 4);
    assert_eq!(body["comment"], "Still good");

    let (status, _) = app.delete(&pan_uri, Some(&organizer.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&pan_uri, Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, all) = app.get("/api/v1/admin/reviews", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (_, list) = app.get(&format!("/api/v1/reviews/event/{}", event_id), None).await;
    assert_eq!(list["totalReviews"], 1);
    assert_eq!(list["avgRating"], 4.0);
}

#[tokio::test]
async fn test_review_notifies_organizer() {
    let app = TestApp::new().await;
    let (organizer, event_id) = app.ga_event(10, 10, 10).await;
    let fan = app.register("Fan", "user").await;
    app.book(&fan.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    app.post("/api/v1/reviews", Some(&fan.token), json!({ "eventId": event_id, "rating": 4 })).await;

    let notifications = app.wait_for_notifications(&organizer.token, 1).await;
    assert_eq!(notifications[0]["type"], "review");
    assert_eq!(notifications[0]["title"], "New Review");
    assert_eq!(notifications[0]["message"], "Fan left a 4-star review on Summer Gig");
    assert_eq!(notifications[0]["relatedEvent"], event_id.as_str());
}

#[tokio::test]
async fn test_announcement_reaches_confirmed_attendees_only() {
    let app = TestApp::new().await;
    let (organizer, event_id) = app.ga_event(10, 10, 10).await;
    let loyal = app.register("Loyal", "user").await;
    let gone = app.register("Gone", "user").await;
    let bystander = app.register("Bystander", "user").await;

    // Two bookings by the same attendee still make one recipient.
    app.book(&loyal.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    app.book(&loyal.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    let (_, dropped) = app.book(&gone.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    app.delete(&format!("/api/v1/bookings/{}", dropped["id"].as_str().unwrap()), Some(&gone.token)).await;

    let (status, body) = app.post("/api/v1/announcements", Some(&organizer.token), json!({
        "eventId": event_id,
        "title": "Doors open early",
        "message": "Gates open at 18:00.",
    })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["sentTo"], json!([loyal.id]));

    let notifications = app.wait_for_notifications(&loyal.token, 3).await;
    let announcement = notifications.iter().find(|n| n["type"] == "event_update").unwrap();
    assert_eq!(announcement["title"], "Announcement: Doors open early");
    assert_eq!(announcement["message"], "Gates open at 18:00.");

    let (_, inbox) = app.get("/api/v1/notifications", Some(&bystander.token)).await;
    assert!(inbox.as_array().unwrap().is_empty());

    assert_eq!(app.job_statuses("ANNOUNCEMENT").await, vec!["PENDING".to_string()]);

    let (status, list) = app.get(&format!("/api/v1/announcements/event/{}", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["title"], "Doors open early");
    assert_eq!(list[0]["sentTo"], json!([loyal.id]));
}

#[tokio::test]
async fn test_announcement_permissions() {
    let app = TestApp::new().await;
    let (organizer, event_id) = app.ga_event(10, 10, 10).await;
    let (rival, _) = app.ga_event(10, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;
    let admin = app.create_admin().await;
    let payload = json!({ "eventId": event_id, "title": "Update", "message": "Parking is full." });

    let (status, _) = app.post("/api/v1/announcements", Some(&buyer.token), payload.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/api/v1/announcements", Some(&rival.token), payload.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post("/api/v1/announcements", Some(&organizer.token), json!({
        "eventId": event_id, "title": " ", "message": "x",
    })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = app.post("/api/v1/announcements", Some(&organizer.token), payload).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["sentTo"], json!([]));
    let uri = format!("/api/v1/announcements/{}", created["id"].as_str().unwrap());

    let (status, _) = app.delete(&uri, Some(&rival.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&uri, Some(&organizer.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_moderates_events() {
    let app = TestApp::new().await;
    let organizer = app.register("Org", "organizer").await;
    let admin = app.create_admin().await;

    let mut draft = common::event_payload(json!([{ "name": "GA", "price": 10, "quantity": 5 }]), 5);
    draft["status"] = json!("draft");
    let (_, event) = app.post("/api/v1/events", Some(&organizer.token), draft).await;
    let event_id = event["id"].as_str().unwrap();

    let (status, list) = app.get("/api/v1/admin/events?status=draft", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, body) = app.put(&format!("/api/v1/admin/events/{}/approve", event_id), Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["status"], "published");

    let (status, body) = app.put(
        &format!("/api/v1/admin/events/{}/reject", event_id),
        Some(&admin.token),
        Some(json!({ "reason": "Missing permit" })),
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["status"], "cancelled");

    let notifications = app.wait_for_notifications(&organizer.token, 2).await;
    let rejected = notifications.iter().find(|n| n["title"] == "Event Rejected").unwrap();
    assert!(rejected["message"].as_str().unwrap().contains("Missing permit"));
    assert!(notifications.iter().any(|n| n["title"] == "Event Approved"));

    let (status, _) = app.put(&format!("/api/v1/admin/events/{}/approve", event_id), Some(&organizer.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/api/v1/admin/events/{}", event_id), Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.put(&format!("/api/v1/admin/events/{}/approve", event_id), Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
