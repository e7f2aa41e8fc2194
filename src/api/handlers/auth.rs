use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use crate::api::dtos::requests::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::api::extractors::{auth::AuthUser, json::ApiJson};
use crate::domain::models::auth::{AuthResponse, UserProfile};
use crate::domain::models::user::{Role, User};
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::{info, warn};

const MIN_PASSWORD_LEN: usize = 6;

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::InvalidRequest("A valid email is required".into())),
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = match payload.role.unwrap_or(Role::User) {
        Role::Admin => return Err(AppError::Forbidden("Admin accounts cannot be self-registered".into())),
        role @ (Role::User | Role::Organizer) => role,
    };

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("Name is required".into()));
    }
    let email = normalize_email(&payload.email)?;
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if state.user_repo.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = state.auth_service.hash_password(&payload.password)?;
    let user = state.user_repo.create(&User::new(name.to_string(), email, password_hash, role)).await?;
    let token = state.auth_service.issue_token(&user)?;

    info!(user_id = %user.id, role = %user.role, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { token, user: UserProfile::from(&user) }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    let user = state.user_repo.find_by_email(&email).await?
        .ok_or(AppError::Unauthorized)?;

    if !state.auth_service.verify_password(&payload.password, &user.password_hash) {
        warn!("Failed login for {}", user.id);
        return Err(AppError::Unauthorized);
    }
    if user.suspended {
        return Err(AppError::Forbidden("Account is suspended".into()));
    }

    let token = state.auth_service.issue_token(&user)?;
    info!("User logged in: {}", user.id);

    Ok(Json(AuthResponse { token, user: UserProfile::from(&user) }))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let mut profile = UserProfile::from(&user);
    profile.booking_count = Some(state.booking_repo.count_by_user(&user.id).await?);
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(mut user): AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(name) = payload.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest("Name cannot be empty".into()));
        }
        user.name = name.to_string();
    }

    if let Some(email) = payload.email {
        let email = normalize_email(&email)?;
        if email != user.email {
            if state.user_repo.find_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict("Email is already in use".into()));
            }
            user.email = email;
        }
    }

    let updated = state.user_repo.update(&user).await?;
    let mut profile = UserProfile::from(&updated);
    profile.booking_count = Some(state.booking_repo.count_by_user(&updated.id).await?);
    Ok(Json(profile))
}
