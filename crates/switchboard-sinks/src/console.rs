use async_trait::async_trait;
use tracing::info;

use crate::{
    error::SinkError,
    sink::NotificationSink,
    types::{Notification, SinkStatus},
};

/// Structured-log delivery adapter.
///
/// Writes each reminder as a tracing event; the daemon's subscriber
/// turns that into console output. Always ready — there is no
/// connection to lose.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, note: &Notification) -> Result<(), SinkError> {
        info!(
            call_id = %note.call_id,
            viewer_id = %note.viewer_id,
            offset_minutes = note.offset_minutes,
            snoozed = note.snoozed,
            scheduled_at = %note.scheduled_at.to_rfc3339(),
            "{}",
            note.headline()
        );
        Ok(())
    }

    fn status(&self) -> SinkStatus {
        SinkStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn deliver_never_fails() {
        let sink = ConsoleSink::new();
        let note = Notification {
            call_id: "c-1".into(),
            viewer_id: "u-1".into(),
            offset_minutes: 5,
            snoozed: false,
            subject: "screening".into(),
            contact: "Acme HR".into(),
            scheduled_at: Utc::now(),
            fired_at: Utc::now(),
        };
        assert!(sink.deliver(&note).await.is_ok());
        assert!(matches!(sink.status(), SinkStatus::Ready));
    }

    #[test]
    fn headline_varies_by_offset() {
        let mut note = Notification {
            call_id: "c-1".into(),
            viewer_id: "u-1".into(),
            offset_minutes: 15,
            snoozed: false,
            subject: "screening".into(),
            contact: "Acme HR".into(),
            scheduled_at: Utc::now(),
            fired_at: Utc::now(),
        };
        assert!(note.headline().starts_with("In 15 min"));
        note.offset_minutes = 0;
        assert!(note.headline().starts_with("Starting now"));
        note.snoozed = true;
        assert!(note.headline().starts_with("Snoozed reminder"));
    }
}
