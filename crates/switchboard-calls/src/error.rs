use thiserror::Error;

use crate::types::CallStatus;

/// Errors from the call store, lifecycle, and visibility paths.
#[derive(Debug, Error)]
pub enum CallError {
    /// No call with the given ID exists in the store.
    #[error("Call not found: {id}")]
    NotFound { id: String },

    /// The requested status change is not a legal lifecycle edge.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: CallStatus, to: CallStatus },

    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Resolving the viewer's permitted targets failed.
    #[error("Permission lookup failed: {0}")]
    Permissions(#[from] switchboard_users::UserError),
}

pub type Result<T> = std::result::Result<T, CallError>;
