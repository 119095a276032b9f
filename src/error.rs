//! Structured error types for handler results.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    DuplicateName,

    // Not found errors
    UserNotFound,
    StatusNotFound,
    LabelNotFound,
    TaskNotFound,

    // Conflict errors
    InUse,

    // Permission errors
    NotAuthenticated,
    Forbidden,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error returned by handler operations.
#[derive(Debug, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn duplicate(field: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateName,
            format!("A record with {} '{}' already exists", field, value),
        )
        .with_field(field)
    }

    pub fn user_not_found(user_id: i64) -> Self {
        Self::new(ErrorCode::UserNotFound, format!("User not found: {}", user_id))
    }

    pub fn status_not_found(status_id: i64) -> Self {
        Self::new(
            ErrorCode::StatusNotFound,
            format!("Status not found: {}", status_id),
        )
    }

    pub fn label_not_found(label_id: i64) -> Self {
        Self::new(
            ErrorCode::LabelNotFound,
            format!("Label not found: {}", label_id),
        )
    }

    pub fn task_not_found(task_id: i64) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task not found: {}", task_id))
    }

    pub fn in_use(kind: &str) -> Self {
        Self::new(
            ErrorCode::InUse,
            format!("Cannot delete {} because it is in use", kind),
        )
    }

    pub fn not_authenticated() -> Self {
        Self::new(
            ErrorCode::NotAuthenticated,
            "You are not logged in. Please log in.",
        )
    }

    pub fn forbidden(reason: &str) -> Self {
        Self::new(ErrorCode::Forbidden, reason)
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to AppError first
        match err.downcast::<AppError>() {
            Ok(app_err) => app_err,
            Err(err) => AppError::internal(err),
        }
    }
}

/// Result type for handler operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
