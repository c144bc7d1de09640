//! Authentication error types.

use notesync_storage::StorageError;
use thiserror::Error;

/// Result type for credential and session operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur during registration, authentication, and session
/// handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Returned uniformly for unknown email and wrong password, so callers
    /// cannot distinguish which check failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account is locked until the given epoch-ms deadline.
    #[error("account locked until {until_ms}")]
    LockedOut { until_ms: i64 },

    /// The presented session token is unknown or expired.
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DuplicateEmail(email) => AuthError::DuplicateEmail(email),
            StorageError::NotFound(what) => AuthError::NotFound(what),
            StorageError::Validation(msg) => AuthError::Validation(msg),
            other => AuthError::Storage(other),
        }
    }
}
