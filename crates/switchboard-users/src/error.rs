use thiserror::Error;

/// All user-layer errors. Kept separate from the core error type so the
/// embedding layer can map them to user-facing messages without
/// coupling subsystems.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Grant not found: {id}")]
    GrantNotFound { id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

pub type Result<T> = std::result::Result<T, UserError>;
