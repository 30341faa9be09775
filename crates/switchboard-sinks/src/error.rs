use thiserror::Error;

/// Errors that can occur within any sink adapter.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A reminder could not be delivered to the underlying surface.
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// The sink-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
