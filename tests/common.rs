#![allow(dead_code)]

use ticketing_backend::{
    api::router::create_router,
    config::Config,
    domain::models::user::{Role, User},
    domain::ports::EmailService,
    domain::services::email_templates::load_templates,
    error::AppError,
    infra::factory::{run_sqlite_migrations, sqlite_state},
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub attachment_name: Option<String>,
    pub attachment: Option<Vec<u8>>,
}

/// Records every message instead of sending it. Can be switched to fail.
#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail: AtomicBool,
}

impl MockEmailService {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        attachment_data: Option<&[u8]>
    ) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::InternalWithMsg("mail relay down".into()));
        }
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            attachment_name: attachment_name.map(str::to_string),
            attachment: attachment_data.map(<[u8]>::to_vec),
        });
        Ok(())
    }
}

pub struct TestUser {
    pub id: String,
    pub token: String,
    pub email: String,
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub emails: Arc<MockEmailService>,
}

pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        run_sqlite_migrations(&pool).await.expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url,
            port: 0,
            jwt_secret: "integration-test-secret".to_string(),
            jwt_ttl_hours: 1,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            frontend_url: "http://frontend.test".to_string(),
            job_poll_interval_secs: 1,
        };

        let emails = Arc::new(MockEmailService::default());
        let templates = Arc::new(load_templates().expect("templates"));

        // The outbox is drained explicitly through `drain_outbox`.
        let state = Arc::new(sqlite_state(&config, pool.clone(), emails.clone(), templates));
        let router = create_router(state.clone());

        Self { router, pool, db_filename, state, emails }
    }

    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        (status, parse_body(response).await)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None, &[]).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body), &[]).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send("PUT", uri, token, body, &[]).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("DELETE", uri, token, None, &[]).await
    }

    pub async fn register(&self, name: &str, role: &str) -> TestUser {
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4());
        let (status, body) = self.post("/api/v1/auth/register", None, json!({
            "name": name,
            "email": email,
            "password": "password123",
            "role": role,
        })).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
            email,
        }
    }

    /// Admins cannot self-register, so the row is seeded directly.
    pub async fn create_admin(&self) -> TestUser {
        let email = format!("admin-{}@example.com", Uuid::new_v4());
        let hash = self.state.auth_service.hash_password("password123").unwrap();
        let user = User::new("Admin".into(), email.clone(), hash, Role::Admin);
        let user = self.state.user_repo.create(&user).await.unwrap();
        let token = self.state.auth_service.issue_token(&user).unwrap();
        TestUser { id: user.id, token, email }
    }

    pub async fn create_event(&self, token: &str, ticket_types: Value, total_seats: i64) -> Value {
        let (status, body) = self.post("/api/v1/events", Some(token), event_payload(ticket_types, total_seats)).await;
        assert_eq!(status, StatusCode::CREATED, "create event failed: {}", body);
        body
    }

    /// Organizer plus a published event with a single GA tier.
    pub async fn ga_event(&self, price: i64, quantity: i64, seats: i64) -> (TestUser, String) {
        let organizer = self.register("Org", "organizer").await;
        let event = self.create_event(
            &organizer.token,
            json!([{ "name": "GA", "price": price, "quantity": quantity }]),
            seats,
        ).await;
        (organizer, event["id"].as_str().unwrap().to_string())
    }

    pub async fn book(&self, token: &str, event_id: &str, tickets: Value) -> (StatusCode, Value) {
        self.post("/api/v1/bookings", Some(token), json!({ "eventId": event_id, "tickets": tickets })).await
    }

    pub async fn book_with_key(&self, token: &str, event_id: &str, tickets: Value, key: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/v1/bookings",
            Some(token),
            Some(json!({ "eventId": event_id, "tickets": tickets })),
            &[("Idempotency-Key", key)],
        ).await
    }

    pub async fn event(&self, event_id: &str) -> Value {
        let (status, body) = self.get(&format!("/api/v1/events/{}", event_id), None).await;
        assert_eq!(status, StatusCode::OK, "get event failed: {}", body);
        body
    }

    pub async fn sold(&self, event_id: &str, ticket_type: &str) -> i64 {
        let event = self.event(event_id).await;
        event["ticketTypes"].as_array().unwrap()
            .iter()
            .find(|t| t["name"] == ticket_type)
            .and_then(|t| t["sold"].as_i64())
            .unwrap()
    }

    /// Asserts `availableSeats == totalSeats - Σ sold` and `0 <= sold <= quantity`.
    pub async fn assert_ledger(&self, event_id: &str) -> Value {
        let event = self.event(event_id).await;
        let tiers = event["ticketTypes"].as_array().unwrap();
        let sold: i64 = tiers.iter().map(|t| t["sold"].as_i64().unwrap()).sum();
        assert_eq!(
            event["availableSeats"].as_i64().unwrap(),
            event["totalSeats"].as_i64().unwrap() - sold,
            "seat ledger drifted: {}", event
        );
        for tier in tiers {
            let sold = tier["sold"].as_i64().unwrap();
            assert!(sold >= 0 && sold <= tier["quantity"].as_i64().unwrap(), "tier out of bounds: {}", tier);
        }
        event
    }

    pub async fn booking_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings").fetch_one(&self.pool).await.unwrap()
    }

    pub async fn job_statuses(&self, job_type: &str) -> Vec<String> {
        sqlx::query_scalar("SELECT status FROM jobs WHERE job_type = ? ORDER BY created_at")
            .bind(job_type)
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }

    pub async fn drain_outbox(&self) -> usize {
        ticketing_backend::background::drain_once(&self.state).await
    }

    /// Notifications are written on a spawned task; poll until `expected` have landed.
    pub async fn wait_for_notifications(&self, token: &str, expected: usize) -> Vec<Value> {
        for _ in 0..100 {
            let (_, body) = self.get("/api/v1/notifications", Some(token)).await;
            let list = body.as_array().cloned().unwrap_or_default();
            if list.len() >= expected {
                return list;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} notifications", expected);
    }
}

pub fn booking_request(token: &str, event_id: &str, tickets: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/bookings")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "eventId": event_id, "tickets": tickets }).to_string()))
        .unwrap()
}

pub fn event_payload(ticket_types: Value, total_seats: i64) -> Value {
    json!({
        "title": "Summer Gig",
        "description": "Live music in the park",
        "category": "Music",
        "date": "2031-07-01",
        "time": "20:00",
        "location": { "venue": "Park Stage", "address": "1 Park Lane", "city": "Oslo", "country": "Norway" },
        "ticketTypes": ticket_types,
        "totalSeats": total_seats,
    })
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
