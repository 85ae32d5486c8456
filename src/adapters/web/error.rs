//! JSON error responses for the REST API.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::JournalError;

/// Rendered as `{"message": "..."}` with the given status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &JournalError) -> StatusCode {
    match err {
        JournalError::Validation { .. } | JournalError::UsernameTaken { .. } => {
            StatusCode::BAD_REQUEST
        }
        JournalError::NotFound { .. } => StatusCode::NOT_FOUND,
        JournalError::Forbidden { .. } => StatusCode::FORBIDDEN,
        JournalError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        JournalError::PasswordHash { .. }
        | JournalError::Database { .. }
        | JournalError::DatabaseQuery { .. }
        | JournalError::ConfigParse { .. }
        | JournalError::ConfigMissing { .. }
        | JournalError::ConfigInvalid { .. }
        | JournalError::Export { .. }
        | JournalError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<JournalError> for ApiError {
    fn from(err: JournalError) -> Self {
        let status = status_from_error(&err);
        let message = match &err {
            JournalError::NotFound { kind, .. } => format!("{} not found", capitalize(kind)),
            JournalError::Forbidden { kind, .. } => format!("Unauthorized access to this {kind}"),
            JournalError::UsernameTaken { .. } => "Username already exists".to_string(),
            JournalError::InvalidCredentials => "Invalid credentials".to_string(),
            JournalError::Validation { .. } => err.to_string(),
            _ => {
                // Internal details stay in the log.
                tracing::error!(error = %err, "request failed");
                "Internal server error".to_string()
            }
        };
        Self::new(status, message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_record() {
        let err = ApiError::from(JournalError::NotFound {
            kind: "trade",
            id: 7,
        });
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Trade not found");
    }

    #[test]
    fn forbidden_message() {
        let err = ApiError::from(JournalError::Forbidden {
            kind: "journal entry",
            id: 2,
        });
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "Unauthorized access to this journal entry");
    }

    #[test]
    fn validation_is_bad_request() {
        let err = ApiError::from(JournalError::validation("symbol", "must not be empty"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("symbol"));
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let err = ApiError::from(JournalError::Database {
            reason: "disk I/O error at /var/db".into(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn credentials_are_unauthorized() {
        assert_eq!(
            status_from_error(&JournalError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }
}
