use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn, info_span, Instrument};
use tera::Context;
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::models::{booking::Booking, event::Event, job::{self, Job}, user::User};
use crate::domain::services::calendar::generate_ics;
use crate::domain::services::email_templates::{
    announcement_subject, cancellation_subject, confirmation_subject,
    ANNOUNCEMENT_TEMPLATE, BOOKING_CANCELLATION_TEMPLATE, BOOKING_CONFIRMATION_TEMPLATE,
};

const BATCH_SIZE: i64 = 10;

pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting email outbox worker...");
    let poll_interval = Duration::from_secs(state.config.job_poll_interval_secs.max(1));

    match state.job_repo.requeue_stalled().await {
        Ok(0) => {}
        Ok(n) => warn!("Requeued {} jobs left in PROCESSING by a previous run", n),
        Err(e) => error!("Failed to requeue stalled jobs: {:?}", e),
    }

    loop {
        drain_once(&state).await;
        sleep(poll_interval).await;
    }
}

/// Claims one batch of due jobs and processes each. Returns how many were claimed.
pub async fn drain_once(state: &Arc<AppState>) -> usize {
    let jobs = match state.job_repo.claim_due(BATCH_SIZE).await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("Failed to fetch pending jobs: {:?}", e);
            return 0;
        }
    };
    let claimed = jobs.len();

    for job in jobs {
        let span = info_span!(
            "background_job",
            job_id = %job.id,
            job_type = %job.job_type,
            user_id = %job.payload.user_id
        );

        async {
            info!("Processing job");
            match process_job(state, &job).await {
                Ok(_) => {
                    info!("Job completed successfully");
                    if let Err(e) = state.job_repo.mark_completed(&job.id).await {
                        error!("Failed to mark job as completed: {:?}", e);
                    }
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    error!("Job failed with error: {}", err_msg);
                    if let Err(up_err) = state.job_repo.mark_failed(&job.id, &err_msg).await {
                        error!("Failed to mark job as failed: {:?}", up_err);
                    }
                }
            }
        }
        .instrument(span)
        .await;
    }

    claimed
}

async fn process_job(state: &Arc<AppState>, job: &Job) -> Result<(), AppError> {
    let recipient = state.user_repo.find_by_id(&job.payload.user_id).await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", job.payload.user_id)))?;

    match job.job_type.as_str() {
        job::BOOKING_CONFIRMATION => send_confirmation(state, job, &recipient).await,
        job::BOOKING_CANCELLATION => send_cancellation(state, job, &recipient).await,
        job::ANNOUNCEMENT => send_announcement(state, job, &recipient).await,
        other => Err(AppError::InternalWithMsg(format!("Unknown job type {}", other))),
    }
}

async fn load_booking(state: &Arc<AppState>, job: &Job) -> Result<Booking, AppError> {
    let booking_id = job.payload.booking_id.as_deref()
        .ok_or_else(|| AppError::InternalWithMsg("Job payload has no booking_id".into()))?;
    state.booking_repo.find_by_id(booking_id).await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", booking_id)))
}

fn render(state: &Arc<AppState>, template: &str, context: &Context) -> Result<String, AppError> {
    state.templates.render(template, context).map_err(|e| {
        error!("Tera render error: {:?}", e);
        AppError::InternalWithMsg(format!("Tera render error: {}", e))
    })
}

fn event_context(context: &mut Context, event: &Event) {
    context.insert("event_title", &event.title);
    context.insert("event_date", &event.date.to_string());
    context.insert("event_time", &event.time);
    context.insert("venue", &event.location.venue);
    context.insert("city", &event.location.city);
}

async fn send_confirmation(state: &Arc<AppState>, job: &Job, recipient: &User) -> Result<(), AppError> {
    let booking = load_booking(state, job).await?;
    let event = state.event_repo.find_by_id(&booking.event_id).await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", booking.event_id)))?;

    let mut context = Context::new();
    context.insert("user_name", &recipient.name);
    context.insert("booking_reference", &booking.booking_reference);
    context.insert("tickets", &booking.tickets.0);
    context.insert("total_amount", &booking.total_amount);
    context.insert("booking_link", &format!("{}/bookings/{}", state.config.frontend_url, booking.id));
    event_context(&mut context, &event);

    let html = render(state, BOOKING_CONFIRMATION_TEMPLATE, &context)?;
    let ics = generate_ics(&event, &booking);

    info!("Sending booking confirmation to {}", recipient.email);
    state.email_service
        .send(&recipient.email, &confirmation_subject(&event.title), &html, Some("event.ics"), Some(ics.as_bytes()))
        .await
}

async fn send_cancellation(state: &Arc<AppState>, job: &Job, recipient: &User) -> Result<(), AppError> {
    let booking = load_booking(state, job).await?;
    let event_title = match state.event_repo.find_by_id(&booking.event_id).await? {
        Some(event) => event.title,
        None => {
            warn!("Event {} no longer exists, sending generic cancellation", booking.event_id);
            "your event".to_string()
        }
    };

    let mut context = Context::new();
    context.insert("user_name", &recipient.name);
    context.insert("booking_reference", &booking.booking_reference);
    context.insert("total_amount", &booking.total_amount);
    context.insert("event_title", &event_title);
    context.insert("events_link", &format!("{}/events", state.config.frontend_url));

    let html = render(state, BOOKING_CANCELLATION_TEMPLATE, &context)?;
    info!("Sending cancellation notice to {}", recipient.email);
    state.email_service
        .send(&recipient.email, &cancellation_subject(&event_title), &html, None, None)
        .await
}

async fn send_announcement(state: &Arc<AppState>, job: &Job, recipient: &User) -> Result<(), AppError> {
    let announcement_id = job.payload.announcement_id.as_deref()
        .ok_or_else(|| AppError::InternalWithMsg("Job payload has no announcement_id".into()))?;
    let announcement = state.announcement_repo.find_by_id(announcement_id).await?
        .ok_or_else(|| AppError::NotFound(format!("Announcement {} not found", announcement_id)))?;
    let event = state.event_repo.find_by_id(&announcement.event_id).await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", announcement.event_id)))?;

    let mut context = Context::new();
    context.insert("user_name", &recipient.name);
    context.insert("title", &announcement.title);
    context.insert("message", &announcement.message);
    context.insert("event_link", &format!("{}/events/{}", state.config.frontend_url, event.id));
    event_context(&mut context, &event);

    let html = render(state, ANNOUNCEMENT_TEMPLATE, &context)?;
    state.email_service
        .send(&recipient.email, &announcement_subject(&event.title, &announcement.title), &html, None, None)
        .await
}
