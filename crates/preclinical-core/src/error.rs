//! Domain error taxonomy shared by the service modules.

use thiserror::Error;

use crate::db::DbError;

/// Errors surfaced by the domain services.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or invalid input, or a cross-reference violation.
    #[error("Validation failed for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Duplicate import or duplicate assignment. Nothing was written.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    /// A cost total exceeds the decimal range.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Database error: {0}")]
    Database(DbError),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Field name for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            CoreError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<DbError> for CoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Duplicate(message) => CoreError::Conflict(message),
            other => CoreError::Database(other),
        }
    }
}

/// Reject empty or whitespace-only required text.
pub(crate) fn require_text(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "is required"));
    }
    Ok(())
}

/// Currency codes are three ASCII letters.
pub(crate) fn require_currency(field: &str, value: &str) -> CoreResult<()> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::validation(
            field,
            format!("'{value}' is not a three-letter currency code"),
        ));
    }
    Ok(())
}
