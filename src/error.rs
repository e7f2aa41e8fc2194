use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Which inventory constraint rejected a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "constraint", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Shortfall {
    TicketType { ticket_type: String, requested: i64, available: i64 },
    Seats { requested: i64, available: i64 },
}

impl Shortfall {
    pub fn requested(&self) -> i64 {
        match self {
            Shortfall::TicketType { requested, .. } | Shortfall::Seats { requested, .. } => *requested,
        }
    }

    pub fn available(&self) -> i64 {
        match self {
            Shortfall::TicketType { available, .. } | Shortfall::Seats { available, .. } => *available,
        }
    }

    pub fn missing(&self) -> i64 {
        self.requested() - self.available().max(0)
    }
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shortfall::TicketType { ticket_type, requested, available } => write!(
                f,
                "Not enough {} tickets available (requested {}, {} remaining)",
                ticket_type, requested, available
            ),
            Shortfall::Seats { requested, available } => write!(
                f,
                "Not enough seats available (requested {}, {} remaining)",
                requested, available
            ),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    InsufficientInventory(Shortfall),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    /// SQLite busy/locked or PostgreSQL serialization failure/deadlock.
    pub fn is_write_conflict(&self) -> bool {
        match self {
            AppError::Database(e) => e
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .map(|code| matches!(code.as_ref(), "5" | "6" | "517" | "40001" | "40P01"))
                .unwrap_or(false),
            _ => false,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(e) => e
                .as_database_error()
                .and_then(|db_err| db_err.code())
                // 2067 = SQLite unique constraint, 1555 = SQLite primary key, 23505 = PostgreSQL
                .map(|code| matches!(code.as_ref(), "2067" | "1555" | "23505"))
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_unique_violation() {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Resource already exists (duplicate entry)", "code": "conflict" })),
            )
                .into_response();
        }

        let (status, code, message) = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal server error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error".to_string()),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error".to_string())
            }
            AppError::InsufficientInventory(shortfall) => return inventory_response(shortfall),
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

fn inventory_response(shortfall: &Shortfall) -> Response {
    let mut body = json!({
        "error": shortfall.to_string(),
        "code": "insufficient_inventory",
        "shortfall": shortfall.missing(),
    });
    if let (Some(obj), Ok(serde_json::Value::Object(details))) =
        (body.as_object_mut(), serde_json::to_value(shortfall))
    {
        obj.extend(details);
    }
    (StatusCode::CONFLICT, Json(body)).into_response()
}

/// Failures that stop the service from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("email templates: {0}")]
    Templates(#[from] tera::Error),
    #[error("mail client: {0}")]
    MailClient(AppError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_reports_missing_units() {
        let s = Shortfall::TicketType { ticket_type: "GA".into(), requested: 8, available: 7 };
        assert_eq!(s.missing(), 1);
        assert!(s.to_string().contains("GA"));

        let s = Shortfall::Seats { requested: 6, available: 4 };
        assert_eq!(s.missing(), 2);
    }

    #[test]
    fn shortfall_serializes_constraint_tag() {
        let s = Shortfall::TicketType { ticket_type: "VIP".into(), requested: 2, available: 0 };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["constraint"], "ticket_type");
        assert_eq!(v["ticketType"], "VIP");
        assert_eq!(v["requested"], 2);
    }
}
