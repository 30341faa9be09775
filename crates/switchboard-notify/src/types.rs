use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use switchboard_calls::Call;

/// How a trigger came to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// A configured ladder offset matched (or was caught up).
    Offset,
    /// A one-shot snooze re-fire.
    Snooze,
}

/// The fact that a reminder fired for a call.
///
/// The (call_id, offset_minutes) pair is the dedup key: while the call
/// stays eligible, at most one fire ever happens per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTrigger {
    pub call_id: String,
    /// Minutes before the call's start at fire time; 0 = "starting now".
    pub offset_minutes: i64,
    pub kind: TriggerKind,
    pub fired_at: DateTime<Utc>,
}

/// A fired trigger plus the call snapshot it was computed from, handed
/// to the delivery layer.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub trigger: NotificationTrigger,
    pub call: Call,
}

/// User actions funneled into the engine's serialization point.
///
/// UI and request handlers never mutate trigger state directly — they
/// send one of these and the engine task applies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyCommand {
    /// Clear the call's displayed reminder and re-fire once after
    /// `minutes`, independent of the offset ladder.
    Snooze { call_id: String, minutes: i64 },
    /// Clear the call's displayed reminder, cancelling any pending
    /// snooze re-fire.
    Dismiss { call_id: String },
}
