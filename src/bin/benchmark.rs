use chrono::{Duration as ChronoDuration, Utc};
use colored::*;
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::error::Error;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

type BenchResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

const STAGE_SECS: u64 = 5;
const SEATS: i64 = 100;
const BUYERS: usize = 25;
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[derive(Default)]
struct StageOutcome {
    confirmed: u64,
    sold_out: u64,
    failed: u64,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "Benchmark aborted:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> BenchResult<()> {
    let base_url = std::env::var("BENCH_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    println!("{}", "Starting booking storm".bold().green());
    println!("Target URL: {}", base_url);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .build()?;

    if client.get(format!("{}/health", base_url)).send().await.is_err() {
        return Err(format!("server is not reachable at {}", base_url).into());
    }

    println!("\n{}", "Setting up organizer, buyers and a scarce event...".yellow());
    let organizer = register(&client, &base_url, "organizer").await?;
    let event_id = create_event(&client, &base_url, &organizer).await?;
    let mut buyers = Vec::with_capacity(BUYERS);
    for _ in 0..BUYERS {
        buyers.push(register(&client, &base_url, "user").await?);
    }
    let buyers = Arc::new(buyers);
    println!("{} event {} with {} seats", "Created".green(), event_id, SEATS);

    println!("{:<10} | {:<12} | {:<12} | {:<10} | {:<10} | {:<8}", "RPS", "Mean (ms)", "P99 (ms)", "Booked", "Sold out", "Errors");
    println!("{:-<10}-+-{:-<12}-+-{:-<12}-+-{:-<10}-+-{:-<10}-+-{:-<8}", "", "", "", "", "", "");

    let mut booked_total = 0;
    for rps in [10u32, 50, 200] {
        booked_total += run_stage(&client, &base_url, &event_id, buyers.clone(), rps).await?;
    }

    verify_ledger(&client, &base_url, &event_id, &organizer, booked_total).await
}

async fn register(client: &Client, base_url: &str, role: &str) -> BenchResult<String> {
    let res = client.post(format!("{}/api/v1/auth/register", base_url))
        .json(&json!({
            "name": format!("Bench {}", role),
            "email": format!("bench-{}@load.test", Uuid::new_v4()),
            "password": "bench-password",
            "role": role,
        }))
        .send()
        .await?;

    if res.status() != StatusCode::CREATED {
        return Err(format!("register failed with status {}", res.status()).into());
    }
    let body: Value = res.json().await?;
    body["token"].as_str().map(str::to_string).ok_or_else(|| "register response has no token".into())
}

async fn create_event(client: &Client, base_url: &str, token: &str) -> BenchResult<String> {
    let res = client.post(format!("{}/api/v1/events", base_url))
        .bearer_auth(token)
        .json(&json!({
            "title": "Benchmark Night",
            "description": "Load testing",
            "category": "Music",
            "date": (Utc::now() + ChronoDuration::days(30)).date_naive(),
            "time": "20:00",
            "location": { "venue": "Server Room", "address": "1 Rack Way", "city": "Localhost", "country": "NA" },
            "ticketTypes": [{ "name": "GA", "price": 2500, "quantity": SEATS }],
            "totalSeats": SEATS,
        }))
        .send()
        .await?;

    if res.status() != StatusCode::CREATED {
        let status = res.status();
        let txt = res.text().await.unwrap_or_default();
        return Err(format!("event creation failed. Status: {}. Body: {}", status, txt).into());
    }
    let body: Value = res.json().await?;
    body["id"].as_str().map(str::to_string).ok_or_else(|| "event response has no id".into())
}

/// Fires booking requests at `rps` for one stage and returns how many tickets were confirmed.
async fn run_stage(client: &Client, base_url: &str, event_id: &str, buyers: Arc<Vec<String>>, rps: u32) -> BenchResult<i64> {
    let quota = NonZeroU32::new(rps).ok_or("rps must be positive")?;
    let limiter = Arc::new(RateLimiter::direct(Quota::per_second(quota)));
    let next_buyer = Arc::new(AtomicUsize::new(0));

    let (tx, mut rx) = mpsc::channel(50000);
    let start_time = Instant::now();
    let duration = Duration::from_secs(STAGE_SECS);
    let url = format!("{}/api/v1/bookings", base_url);

    while start_time.elapsed() < duration {
        if limiter.check().is_ok() {
            let client = client.clone();
            let url = url.clone();
            let event_id = event_id.to_string();
            let buyers = buyers.clone();
            let idx = next_buyer.fetch_add(1, Ordering::Relaxed) % buyers.len();
            let tx = tx.clone();

            tokio::spawn(async move {
                let req_start = Instant::now();
                let res = client.post(&url)
                    .bearer_auth(&buyers[idx])
                    .json(&json!({ "eventId": event_id, "tickets": [{ "ticketType": "GA", "quantity": 1 }] }))
                    .send()
                    .await;
                let status = res.map(|r| r.status()).ok();
                let _ = tx.send((req_start.elapsed(), status)).await;
            });
        } else {
            tokio::task::yield_now().await;
        }
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3)?;
    let mut outcome = StageOutcome::default();

    while let Some((latency, status)) = rx.recv().await {
        histogram.record(latency.as_micros() as u64)?;
        match status {
            Some(StatusCode::CREATED) => outcome.confirmed += 1,
            Some(StatusCode::CONFLICT) => outcome.sold_out += 1,
            _ => outcome.failed += 1,
        }
    }

    let mean_ms = histogram.mean() / 1000.0;
    let p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;

    println!(
        "{:<10} | {:<12.2} | {:<12.2} | {:<10} | {:<10} | {:<8}",
        rps,
        mean_ms,
        p99_ms,
        outcome.confirmed,
        outcome.sold_out,
        if outcome.failed > 0 { outcome.failed.to_string().red() } else { "0".normal() }
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok(outcome.confirmed as i64)
}

async fn verify_ledger(client: &Client, base_url: &str, event_id: &str, organizer: &str, booked: i64) -> BenchResult<()> {
    let event: Value = client.get(format!("{}/api/v1/events/{}", base_url, event_id))
        .send()
        .await?
        .json()
        .await?;

    let total = event["totalSeats"].as_i64().ok_or("event has no totalSeats")?;
    let available = event["availableSeats"].as_i64().ok_or("event has no availableSeats")?;
    let tiers = event["ticketTypes"].as_array().ok_or("event has no ticketTypes")?;
    let sold: i64 = tiers.iter().filter_map(|t| t["sold"].as_i64()).sum();
    let within_quota = tiers.iter().all(|t| {
        matches!((t["sold"].as_i64(), t["quantity"].as_i64()), (Some(s), Some(q)) if s >= 0 && s <= q)
    });

    let dashboard: Value = client.get(format!("{}/api/v1/organizer/events/{}/dashboard", base_url, event_id))
        .bearer_auth(organizer)
        .send()
        .await?
        .json()
        .await?;
    let confirmed = dashboard["stats"]["confirmedBookings"].as_i64().unwrap_or(-1);

    println!("\n{}", "Ledger check".bold());
    println!("  seats {} / available {} / sold {} / booked {} / confirmed {}", total, available, sold, booked, confirmed);

    let checks = [
        ("available == total - sold", available == total - sold),
        ("0 <= sold <= quantity", within_quota),
        ("never oversold", sold <= SEATS && available >= 0),
        ("every 201 is in the ledger", sold == booked && confirmed == booked),
    ];

    let mut ok = true;
    for (name, passed) in checks {
        let mark = if passed { "PASS".green().bold() } else { "FAIL".red().bold() };
        println!("  [{}] {}", mark, name);
        ok &= passed;
    }

    if ok { Ok(()) } else { Err("ledger invariants violated".into()) }
}
