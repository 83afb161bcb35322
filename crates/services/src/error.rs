//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{SessionStateError, SessionStatus};
use storage::repository::StorageError;

/// Errors emitted by the session store and orchestrator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Referenced session or question does not exist.
    #[error("session or question not found")]
    NotFound,

    /// Operation is illegal for the session's current status.
    #[error("operation not allowed while session is {status:?}")]
    InvalidState { status: SessionStatus },

    /// Malformed input, e.g. an out-of-range question index. Never coerced.
    #[error(transparent)]
    Validation(SessionStateError),

    /// The acting user does not own the session.
    #[error("session belongs to another user")]
    Forbidden,

    /// The orchestrator already has an active session for this context.
    #[error("another session is already active")]
    AlreadyActive,

    /// An operation that needs a current session was called without one.
    #[error("no active session")]
    NoActiveSession,

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => SessionError::NotFound,
            other => SessionError::Storage(other),
        }
    }
}

impl From<SessionStateError> for SessionError {
    fn from(err: SessionStateError) -> Self {
        match err {
            SessionStateError::InvalidTransition { from } => {
                SessionError::InvalidState { status: from }
            }
            other => SessionError::Validation(other),
        }
    }
}
