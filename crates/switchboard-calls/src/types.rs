use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Waiting for its scheduled time. The only state the reminder
    /// ladder evaluates in full.
    Scheduled,
    /// The call is underway; only the "starting now" reminder may still fire.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully (no answer, declined, dropped).
    Failed,
    /// Transitional marker used by external writers mid-reschedule;
    /// never eligible for reminders.
    Rescheduled,
    /// Called off before it started. Terminal.
    Cancelled,
}

impl CallStatus {
    /// Terminal states are inert for notification purposes and never
    /// transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed | CallStatus::Failed | CallStatus::Cancelled
        )
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallStatus::Scheduled => "scheduled",
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::Rescheduled => "rescheduled",
            CallStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(CallStatus::Scheduled),
            "in_progress" => Ok(CallStatus::InProgress),
            "completed" => Ok(CallStatus::Completed),
            "failed" => Ok(CallStatus::Failed),
            "rescheduled" => Ok(CallStatus::Rescheduled),
            "cancelled" => Ok(CallStatus::Cancelled),
            other => Err(format!("unknown call status: {other}")),
        }
    }
}

/// Display ordering hint for the viewer's schedule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl std::fmt::Display for CallPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallPriority::Low => "low",
            CallPriority::Normal => "normal",
            CallPriority::High => "high",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CallPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(CallPriority::Low),
            "normal" => Ok(CallPriority::Normal),
            "high" => Ok(CallPriority::High),
            other => Err(format!("unknown call priority: {other}")),
        }
    }
}

/// A scheduled call or interview.
///
/// `id` and `owner_id` are immutable after creation; `scheduled_at`
/// changes only through the reschedule transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    /// UUID string — primary key.
    pub id: String,
    /// The user whose schedule this call belongs to.
    pub owner_id: String,
    /// Who is being called (candidate name, phone contact, …).
    pub contact: String,
    /// One-line purpose of the call.
    pub subject: String,
    /// Planned start instant (UTC).
    pub scheduled_at: DateTime<Utc>,
    /// Planned length in minutes.
    pub duration_mins: u32,
    pub status: CallStatus,
    pub priority: CallPriority,
    /// Free-text notes; lifecycle transitions append outcome text here.
    pub notes: Option<String>,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 timestamp of the last mutation.
    pub updated_at: String,
}

impl Call {
    /// Build a new Scheduled call with a fresh id.
    pub fn new(
        owner_id: impl Into<String>,
        contact: impl Into<String>,
        subject: impl Into<String>,
        scheduled_at: DateTime<Utc>,
        duration_mins: u32,
    ) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            contact: contact.into(),
            subject: subject.into(),
            scheduled_at,
            duration_mins,
            status: CallStatus::Scheduled,
            priority: CallPriority::Normal,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
