mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use tokio::task::JoinSet;
use tower::ServiceExt;

#[tokio::test]
async fn test_booking_claims_inventory_and_prices_lines() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;

    let (status, body) = app.book(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": 3 }])).await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["totalAmount"], 150);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["tickets"][0]["ticketType"], "GA");
    assert_eq!(body["tickets"][0]["price"], 50);
    assert!(body["bookingReference"].as_str().unwrap().starts_with("BK-"));
    assert_eq!(body["event"]["id"], event_id.as_str());
    assert_eq!(body["user"]["id"], buyer.id.as_str());
    assert!(body.get("idempotencyKey").is_none());

    let event = app.assert_ledger(&event_id).await;
    assert_eq!(event["ticketTypes"][0]["sold"], 3);
    assert_eq!(event["availableSeats"], 7);
}

#[tokio::test]
async fn test_oversized_request_reports_shortfall_and_leaves_ledger() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;

    let (status, _) = app.book(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": 3 }])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.book(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": 8 }])).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "insufficient_inventory");
    assert_eq!(body["constraint"], "ticket_type");
    assert_eq!(body["ticketType"], "GA");
    assert_eq!(body["requested"], 8);
    assert_eq!(body["available"], 7);
    assert_eq!(body["shortfall"], 1);

    let event = app.assert_ledger(&event_id).await;
    assert_eq!(event["ticketTypes"][0]["sold"], 3);
    assert_eq!(event["availableSeats"], 7);
    assert_eq!(app.booking_count().await, 1);
}

#[tokio::test]
async fn test_seat_pool_limits_across_tiers() {
    let app = TestApp::new().await;
    let organizer = app.register("Org", "organizer").await;
    let event = app.create_event(&organizer.token, json!([
        { "name": "GA", "price": 40, "quantity": 10 },
        { "name": "VIP", "price": 100, "quantity": 10 },
    ]), 12).await;
    let event_id = event["id"].as_str().unwrap();
    let buyer = app.register("Buyer", "user").await;

    let (status, body) = app.book(&buyer.token, event_id, json!([
        { "ticketType": "GA", "quantity": 8 },
        { "ticketType": "VIP", "quantity": 5 },
    ])).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["constraint"], "seats");
    assert_eq!(body["requested"], 13);
    assert_eq!(body["available"], 12);

    let event = app.assert_ledger(event_id).await;
    assert_eq!(event["availableSeats"], 12);
    assert_eq!(app.booking_count().await, 0);
}

#[tokio::test]
async fn test_unknown_ticket_type_is_invalid() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;

    let (status, body) = app.book(&buyer.token, &event_id, json!([{ "ticketType": "Balcony", "quantity": 1 }])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert!(body["error"].as_str().unwrap().contains("Balcony"));
    assert_eq!(app.booking_count().await, 0);
    let event = app.assert_ledger(&event_id).await;
    assert_eq!(event["availableSeats"], 10);
}

#[tokio::test]
async fn test_malformed_selections_are_rejected() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;

    let (status, _) = app.book(&buyer.token, &event_id, json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.book(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": 0 }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.book(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": -2 }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.book(&buyer.token, "missing-event", json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.booking_count().await, 0);
}

#[tokio::test]
async fn test_undecodable_body_gets_structured_error() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;

    let (status, body) = app.book(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": "three" }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert!(body["error"].as_str().unwrap().contains("quantity"), "{}", body);

    let (status, body) = app.post("/api/v1/bookings", Some(&buyer.token), json!({ "eventId": event_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    assert_eq!(app.booking_count().await, 0);
    app.assert_ledger(&event_id).await;
}

#[tokio::test]
async fn test_duplicate_lines_are_merged() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;

    let (status, body) = app.book(&buyer.token, &event_id, json!([
        { "ticketType": "GA", "quantity": 2 },
        { "ticketType": "GA", "quantity": 3 },
    ])).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tickets"].as_array().unwrap().len(), 1);
    assert_eq!(body["tickets"][0]["quantity"], 5);
    assert_eq!(body["totalAmount"], 250);
    assert_eq!(app.sold(&event_id, "GA").await, 5);
}

#[tokio::test]
async fn test_unpublished_event_is_not_bookable() {
    let app = TestApp::new().await;
    let organizer = app.register("Org", "organizer").await;
    let mut payload = common::event_payload(json!([{ "name": "GA", "price": 10, "quantity": 5 }]), 5);
    payload["status"] = json!("draft");
    let (status, event) = app.post("/api/v1/events", Some(&organizer.token), payload).await;
    assert_eq!(status, StatusCode::CREATED);
    let buyer = app.register("Buyer", "user").await;

    let (status, body) = app.book(&buyer.token, event["id"].as_str().unwrap(), json!([{ "ticketType": "GA", "quantity": 1 }])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Event is not available for booking");
}

#[tokio::test]
async fn test_booking_requires_bearer_token() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;

    let (status, body) = app.post("/api/v1/bookings", None, json!({
        "eventId": event_id,
        "tickets": [{ "ticketType": "GA", "quantity": 1 }],
    })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = app.book("not-a-jwt", &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_never_oversell() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let first = app.register("First", "user").await;
    let second = app.register("Second", "user").await;

    let six = json!([{ "ticketType": "GA", "quantity": 6 }]);
    let (a, b) = tokio::join!(
        app.book(&first.token, &event_id, six.clone()),
        app.book(&second.token, &event_id, six.clone()),
    );

    let statuses = [a.0, b.0];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1, "{:?}", statuses);
    let loser = if a.0 == StatusCode::CREATED { b.1 } else { a.1 };
    assert_eq!(loser["code"], "insufficient_inventory");
    assert_eq!(loser["requested"], 6);
    assert_eq!(loser["available"], 4);

    let event = app.assert_ledger(&event_id).await;
    assert_eq!(event["ticketTypes"][0]["sold"], 6);
    assert_eq!(event["availableSeats"], 4);
    assert_eq!(app.booking_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_ticket_goes_to_exactly_one_buyer() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(20, 1, 1).await;
    let first = app.register("First", "user").await;
    let second = app.register("Second", "user").await;

    let one = json!([{ "ticketType": "GA", "quantity": 1 }]);
    let (a, b) = tokio::join!(
        app.book(&first.token, &event_id, one.clone()),
        app.book(&second.token, &event_id, one.clone()),
    );

    let mut statuses = vec![a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    let event = app.assert_ledger(&event_id).await;
    assert_eq!(event["availableSeats"], 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_booking_storm_matches_ledger() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(10, 15, 15).await;

    let mut buyers = Vec::new();
    for i in 0..8 {
        buyers.push(app.register(&format!("Buyer{}", i), "user").await);
    }

    let mut set = JoinSet::new();
    for buyer in &buyers {
        let request = common::booking_request(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": 3 }]));
        set.spawn(app.router.clone().oneshot(request));
    }

    let mut statuses = Vec::new();
    while let Some(res) = set.join_next().await {
        statuses.push(res.unwrap().unwrap().status());
    }

    let confirmed = statuses.iter().filter(|s| **s == StatusCode::CREATED).count() as i64;
    assert_eq!(confirmed, 5);
    assert!(statuses.iter().all(|s| *s == StatusCode::CREATED || *s == StatusCode::CONFLICT));

    let event = app.assert_ledger(&event_id).await;
    assert_eq!(event["ticketTypes"][0]["sold"].as_i64().unwrap(), confirmed * 3);
    assert_eq!(app.booking_count().await, confirmed);
}

#[tokio::test]
async fn test_idempotent_retry_returns_original_booking() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;
    let tickets = json!([{ "ticketType": "GA", "quantity": 2 }]);

    let (status, first) = app.book_with_key(&buyer.token, &event_id, tickets.clone(), "checkout-42").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, retry) = app.book_with_key(&buyer.token, &event_id, tickets.clone(), "checkout-42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(retry["id"], first["id"]);
    assert_eq!(retry["bookingReference"], first["bookingReference"]);
    assert_eq!(retry["event"]["id"], event_id.as_str());

    assert_eq!(app.sold(&event_id, "GA").await, 2);
    assert_eq!(app.booking_count().await, 1);
    assert_eq!(app.job_statuses("BOOKING_CONFIRMATION").await.len(), 1);
}

#[tokio::test]
async fn test_idempotency_key_reuse_with_other_selection_conflicts() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;

    let (status, _) = app.book_with_key(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": 2 }]), "k-1").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.book_with_key(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": 3 }]), "k-1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
    assert_eq!(app.sold(&event_id, "GA").await, 2);
}

#[tokio::test]
async fn test_idempotency_keys_are_scoped_per_user() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let alice = app.register("Alice", "user").await;
    let bob = app.register("Bob", "user").await;
    let tickets = json!([{ "ticketType": "GA", "quantity": 1 }]);

    let (a, first) = app.book_with_key(&alice.token, &event_id, tickets.clone(), "same-key").await;
    let (b, second) = app.book_with_key(&bob.token, &event_id, tickets.clone(), "same-key").await;

    assert_eq!(a, StatusCode::CREATED);
    assert_eq!(b, StatusCode::CREATED);
    assert_ne!(first["id"], second["id"]);
    assert_eq!(app.sold(&event_id, "GA").await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_retries_with_same_key_book_once() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;
    let tickets = json!([{ "ticketType": "GA", "quantity": 2 }]);

    let (a, b) = tokio::join!(
        app.book_with_key(&buyer.token, &event_id, tickets.clone(), "double-click"),
        app.book_with_key(&buyer.token, &event_id, tickets.clone(), "double-click"),
    );

    assert!(a.0.is_success() && b.0.is_success(), "{:?} {:?}", a, b);
    assert_eq!(a.1["id"], b.1["id"]);
    assert_eq!(app.sold(&event_id, "GA").await, 2);
    assert_eq!(app.booking_count().await, 1);
}

#[tokio::test]
async fn test_booking_visibility() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let owner = app.register("Owner", "user").await;
    let stranger = app.register("Stranger", "user").await;
    let admin = app.create_admin().await;

    let (_, booking) = app.book(&owner.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;
    let uri = format!("/api/v1/bookings/{}", booking["id"].as_str().unwrap());

    let (status, body) = app.get(&uri, Some(&owner.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], owner.email.as_str());

    let (status, _) = app.get(&uri, Some(&stranger.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&uri, Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/v1/bookings/unknown", Some(&owner.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, mine) = app.get("/api/v1/bookings/mine", Some(&owner.token)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, theirs) = app.get("/api/v1/bookings/mine", Some(&stranger.token)).await;
    assert!(theirs.as_array().unwrap().is_empty());

    let (status, _) = app.get("/api/v1/bookings", Some(&owner.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, all) = app.get("/api/v1/bookings", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_booking_notifies_purchaser() {
    let app = TestApp::new().await;
    let (_org, event_id) = app.ga_event(50, 10, 10).await;
    let buyer = app.register("Buyer", "user").await;

    let (_, booking) = app.book(&buyer.token, &event_id, json!([{ "ticketType": "GA", "quantity": 1 }])).await;

    let notifications = app.wait_for_notifications(&buyer.token, 1).await;
    assert_eq!(notifications[0]["type"], "booking");
    assert_eq!(notifications[0]["title"], "Booking Confirmed");
    assert_eq!(notifications[0]["relatedBooking"], booking["id"]);
    assert!(notifications[0]["message"].as_str().unwrap().contains(booking["bookingReference"].as_str().unwrap()));
}
