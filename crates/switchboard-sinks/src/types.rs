use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fired reminder, ready for delivery.
///
/// Carries a snapshot of the call so sinks never reach back into the
/// data layer at render time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// The call this reminder is about.
    pub call_id: String,
    /// The viewer session the reminder was produced for.
    pub viewer_id: String,
    /// Minutes before the call's start; 0 means "starting now".
    pub offset_minutes: i64,
    /// True when this is a snooze re-fire rather than a ladder offset.
    pub snoozed: bool,
    /// Call subject line at fire time.
    pub subject: String,
    /// Who is being called.
    pub contact: String,
    /// The call's planned start.
    pub scheduled_at: DateTime<Utc>,
    /// When the reminder fired.
    pub fired_at: DateTime<Utc>,
}

impl Notification {
    /// Human-readable one-liner used by text-based sinks.
    pub fn headline(&self) -> String {
        if self.snoozed {
            format!("Snoozed reminder: {} with {}", self.subject, self.contact)
        } else if self.offset_minutes == 0 {
            format!("Starting now: {} with {}", self.subject, self.contact)
        } else {
            format!(
                "In {} min: {} with {}",
                self.offset_minutes, self.subject, self.contact
            )
        }
    }
}

/// Runtime state of a sink adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkStatus {
    /// Ready to deliver.
    Ready,
    /// Delivery is currently failing; the reason is best-effort.
    Degraded(String),
}
