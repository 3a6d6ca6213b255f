//! Persistence errors.

use thiserror::Error;

/// Error reported by a storage backend or its statement handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend rejected the operation (constraint violation, I/O, ...).
    #[error("database error: {message}")]
    Backend { code: Option<i32>, message: String },

    /// Anything else that went wrong while preparing, binding or executing.
    #[error("{0}")]
    Unexpected(String),
}

impl StoreError {
    /// Create an unexpected error.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Backend error code, if the backend reported one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Backend { code, .. } => *code,
            Self::Unexpected(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(failure, message) => Self::Backend {
                code: Some(failure.extended_code),
                message: message.unwrap_or_else(|| failure.to_string()),
            },
            other => Self::Backend {
                code: None,
                message: other.to_string(),
            },
        }
    }
}

/// Failure surfaced by [`crate::AuditSink::persist`].
///
/// Displays as `@CODE=<code>@<message>`; the code segment is empty when the
/// failure did not come with a backend code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("@CODE={}@{message}", .code.map(|c| c.to_string()).unwrap_or_default())]
pub struct PersistError {
    /// Backend error code.
    pub code: Option<i32>,
    /// Backend or internal message.
    pub message: String,
}

impl From<StoreError> for PersistError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Backend { code, message } => Self { code, message },
            StoreError::Unexpected(message) => Self {
                code: None,
                message,
            },
        }
    }
}
