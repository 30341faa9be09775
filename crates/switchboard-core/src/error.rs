use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwitchboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SwitchboardError {
    /// Short error code string for log correlation and UI mapping.
    pub fn code(&self) -> &'static str {
        match self {
            SwitchboardError::Config(_) => "CONFIG_ERROR",
            SwitchboardError::PermissionDenied { .. } => "PERMISSION_DENIED",
            SwitchboardError::UserNotFound { .. } => "USER_NOT_FOUND",
            SwitchboardError::Database(_) => "DATABASE_ERROR",
            SwitchboardError::Serialization(_) => "SERIALIZATION_ERROR",
            SwitchboardError::Io(_) => "IO_ERROR",
            SwitchboardError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SwitchboardError>;
