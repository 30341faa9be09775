use thiserror::Error;

/// Errors surfaced by the notification engine's public handle.
///
/// Per-tick fetch failures are deliberately absent: the engine logs and
/// retries them on the next interval instead of surfacing per-tick
/// health to callers.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The engine's command queue is full; the action was dropped.
    #[error("Engine command queue is full")]
    QueueFull,

    /// The engine task has stopped; no commands can be applied.
    #[error("Engine is no longer running")]
    EngineStopped,
}

pub type Result<T> = std::result::Result<T, NotifyError>;
