use axum::{extract::FromRequestParts, http::request::Parts};
use crate::error::AppError;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const MAX_KEY_LEN: usize = 255;

/// Optional `Idempotency-Key` header. Blank values count as absent.
pub struct IdempotencyKey(pub Option<String>);

impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(IDEMPOTENCY_HEADER) else {
            return Ok(IdempotencyKey(None));
        };

        let key = raw.to_str()
            .map_err(|_| AppError::InvalidRequest("Idempotency-Key must be visible ASCII".into()))?
            .trim();

        if key.is_empty() {
            return Ok(IdempotencyKey(None));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(AppError::InvalidRequest(format!("Idempotency-Key longer than {} characters", MAX_KEY_LEN)));
        }

        Ok(IdempotencyKey(Some(key.to_string())))
    }
}
