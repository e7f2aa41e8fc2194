pub mod auth;
pub mod idempotency;
pub mod json;
