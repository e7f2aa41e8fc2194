use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crate::api::dtos::{
    requests::{CreateReviewRequest, UpdateReviewRequest},
    responses::{MessageResponse, ReviewListResponse, ReviewWithAuthor},
};
use crate::api::extractors::{auth::AuthUser, json::ApiJson};
use crate::domain::models::{
    notification::{NewNotification, NotificationType},
    review::{rating_in_range, Review, MAX_RATING, MIN_RATING},
    user::{User, UserSummary},
};
use crate::domain::services::reporting::average_rating;
use crate::error::AppError;
use crate::state::AppState;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

fn check_rating(rating: i64) -> Result<(), AppError> {
    if rating_in_range(rating) {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING)))
    }
}

/// Attaches the author summary to each review.
pub async fn with_authors(state: &Arc<AppState>, reviews: Vec<Review>) -> Result<Vec<ReviewWithAuthor>, AppError> {
    let mut authors: HashMap<String, Option<User>> = HashMap::new();
    for review in &reviews {
        if !authors.contains_key(&review.user_id) {
            let author = state.user_repo.find_by_id(&review.user_id).await?;
            authors.insert(review.user_id.clone(), author);
        }
    }
    Ok(reviews
        .into_iter()
        .map(|review| ReviewWithAuthor {
            user: authors.get(&review.user_id).and_then(Option::as_ref).map(UserSummary::from),
            review,
        })
        .collect())
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_rating(payload.rating)?;

    let event = state.event_repo.find_by_id(&payload.event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))?;

    if !state.booking_repo.has_confirmed_booking(&user.id, &event.id).await? {
        return Err(AppError::Forbidden("You can only review events you have attended".into()));
    }
    if state.review_repo.find_by_user_and_event(&user.id, &event.id).await?.is_some() {
        return Err(AppError::Conflict("You have already reviewed this event".into()));
    }

    let review = Review::new(event.id.clone(), user.id.clone(), payload.rating, payload.comment.trim().to_string());
    let created = state.review_repo.create(&review).await?;
    info!(review_id = %created.id, event_id = %event.id, "Review created");

    state.notifier.emit(
        NewNotification::new(
            &event.organizer_id,
            NotificationType::Review,
            "New Review",
            format!("{} left a {}-star review on {}", user.name, created.rating, event.title),
        )
        .for_event(&event.id),
    );

    Ok((
        StatusCode::CREATED,
        Json(ReviewWithAuthor { review: created, user: Some(UserSummary::from(&user)) }),
    ))
}

pub async fn list_event_reviews(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let reviews = state.review_repo.list_by_event(&event_id).await?;
    let avg_rating = average_rating(&reviews);
    let total_reviews = reviews.len() as i64;

    Ok(Json(ReviewListResponse {
        reviews: with_authors(&state, reviews).await?,
        avg_rating,
        total_reviews,
    }))
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut review = state.review_repo.find_by_id(&review_id).await?
        .ok_or(AppError::NotFound("Review not found".into()))?;

    if review.user_id != user.id {
        return Err(AppError::Forbidden("Not authorized".into()));
    }

    if let Some(rating) = payload.rating {
        check_rating(rating)?;
        review.rating = rating;
    }
    if let Some(comment) = payload.comment {
        review.comment = comment.trim().to_string();
    }

    let updated = state.review_repo.update(&review).await?;
    Ok(Json(ReviewWithAuthor { review: updated, user: Some(UserSummary::from(&user)) }))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let review = state.review_repo.find_by_id(&review_id).await?
        .ok_or(AppError::NotFound("Review not found".into()))?;

    if !user.owns_or_admin(&review.user_id) {
        return Err(AppError::Forbidden("Not authorized".into()));
    }

    state.review_repo.delete(&review.id).await?;
    Ok(Json(MessageResponse::new("Review removed")))
}
