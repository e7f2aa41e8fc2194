use axum::{
    extract::{FromRequestParts, FromRef},
    http::{header::AUTHORIZATION, request::Parts},
};
use crate::state::AppState;
use crate::domain::models::user::User;
use crate::error::AppError;
use std::sync::Arc;
use tracing::{debug, Span};

/// The caller behind `Authorization: Bearer <jwt>`, loaded fresh from the store.
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts.headers.get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);
        let claims = app_state.auth_service.verify_token(token)?;

        // Role and suspension come from the row, not the token.
        let user = app_state.user_repo.find_by_id(&claims.sub).await?
            .ok_or_else(|| {
                debug!("Token subject {} no longer exists", claims.sub);
                AppError::Unauthorized
            })?;

        if user.suspended {
            return Err(AppError::Forbidden("Account is suspended".into()));
        }

        Span::current().record("user_id", &user.id);

        Ok(AuthUser(user))
    }
}

/// An authenticated caller holding the admin role.
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}

/// An authenticated caller allowed to manage events (organizer or admin).
pub struct OrganizerUser(pub User);

impl<S> FromRequestParts<S> for OrganizerUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.can_manage_events() {
            return Err(AppError::Forbidden("Organizer access required".into()));
        }
        Ok(OrganizerUser(user))
    }
}
