use async_trait::async_trait;

use crate::{
    error::SinkError,
    types::{Notification, SinkStatus},
};

/// Common interface implemented by every delivery adapter (console,
/// in-app feed, OS notification bridge, …).
///
/// Implementations must be `Send + Sync` so they can be stored in a
/// [`SinkManager`](crate::manager::SinkManager) and driven from the
/// engine task.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Stable lowercase identifier for this sink (e.g. `"console"`).
    ///
    /// Used as the key inside the manager; must be unique across all
    /// registered adapters.
    fn name(&self) -> &str;

    /// Deliver a single reminder.
    ///
    /// The engine treats this as fire-and-forget: an `Err` is logged by
    /// the manager but trigger state is never rolled back.
    async fn deliver(&self, note: &Notification) -> Result<(), SinkError>;

    /// Return the current runtime status without blocking.
    fn status(&self) -> SinkStatus;
}
