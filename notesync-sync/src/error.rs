//! Sync error types.

use notesync_auth::AuthError;
use notesync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the sync engine and access guard.
///
/// Push conflicts are not errors — they are reported per item in the push
/// outcome so the client can re-resolve and retry.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No valid session for the presented token.
    #[error("unauthenticated")]
    Unauthenticated,

    /// A referenced item belongs to a different user.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Auth(AuthError),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for SyncError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Forbidden(what) => SyncError::Forbidden(what),
            StorageError::NotFound(what) => SyncError::NotFound(what),
            StorageError::Validation(msg) => SyncError::Validation(msg),
            other => SyncError::Storage(other),
        }
    }
}

impl From<AuthError> for SyncError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthenticated => SyncError::Unauthenticated,
            other => SyncError::Auth(other),
        }
    }
}
