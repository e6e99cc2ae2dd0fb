use serde::{Deserialize, Serialize};

pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
pub const ROW_NOT_FOUND: &str = "ROW_NOT_FOUND";
pub const INVALID_PAYLOAD: &str = "INVALID_PAYLOAD";
pub const INVALID_QUERY: &str = "INVALID_QUERY";
pub const CONSTRAINT_VIOLATION: &str = "CONSTRAINT_VIOLATION";

/// Uniform shape every backend failure is normalised into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct BackendError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(UNKNOWN_ERROR, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.code == UNKNOWN_ERROR
    }
}

impl From<anyhow::Error> for BackendError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(backend) = err.downcast_ref::<BackendError>() {
            return backend.clone();
        }
        if let Some(sqlite) = err.downcast_ref::<rusqlite::Error>() {
            if let Some(normalized) = normalize_sqlite(sqlite) {
                return normalized.with_details(format!("{err:#}"));
            }
        }
        let root = err.root_cause().to_string();
        let message = err.to_string();
        let mut normalized = BackendError::unknown(if message.is_empty() {
            "An unknown error occurred".to_string()
        } else {
            message
        });
        if root != normalized.message {
            normalized.details = Some(root);
        }
        normalized
    }
}

fn normalize_sqlite(err: &rusqlite::Error) -> Option<BackendError> {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(BackendError::new(
                CONSTRAINT_VIOLATION,
                message
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string()),
            ))
        }
        rusqlite::Error::QueryReturnedNoRows => {
            Some(BackendError::new(ROW_NOT_FOUND, "no rows returned"))
        }
        _ => None,
    }
}

/// Client-side validation failure for one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
