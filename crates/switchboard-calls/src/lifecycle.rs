use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{CallError, Result};
use crate::store::{CallStore, StatusUpdate};
use crate::types::{Call, CallStatus};

/// A lifecycle change the notification engine must react to.
///
/// Sent over the engine's command funnel so trigger-state mutation
/// stays serialized in one task; handlers never touch the trigger map
/// directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Call moved to InProgress: future-offset reminders are void, the
    /// "starting now" reminder may still fire once.
    Started { call_id: String },
    /// Call reached Completed/Failed/Cancelled: every pending reminder is void.
    Finished { call_id: String },
    /// Call got a new start time: prior reminders no longer correspond
    /// to it; the next pass re-evaluates from the new time.
    Rescheduled { call_id: String },
}

impl LifecycleEvent {
    pub fn call_id(&self) -> &str {
        match self {
            LifecycleEvent::Started { call_id }
            | LifecycleEvent::Finished { call_id }
            | LifecycleEvent::Rescheduled { call_id } => call_id,
        }
    }
}

/// The state machine governing call status transitions.
///
/// Legal edges: Scheduled→InProgress (`start`), InProgress→Completed
/// (`complete`), InProgress→Failed (`fail`), Scheduled→Scheduled with a
/// new time (`reschedule`), Scheduled→Cancelled (`cancel`). Everything
/// else is `InvalidTransition`.
pub struct CallLifecycle {
    store: Arc<dyn CallStore>,
    /// If set, transitions forward their invalidation event here.
    /// The sender is non-blocking (`try_send`) so request handlers are
    /// never stalled by a busy engine.
    events_tx: Option<mpsc::Sender<LifecycleEvent>>,
}

impl CallLifecycle {
    pub fn new(store: Arc<dyn CallStore>, events_tx: Option<mpsc::Sender<LifecycleEvent>>) -> Self {
        Self { store, events_tx }
    }

    /// Scheduled → InProgress.
    pub fn start(&self, call_id: &str) -> Result<Call> {
        let call = self.require(call_id)?;
        self.check_edge(&call, CallStatus::Scheduled, CallStatus::InProgress)?;

        self.store
            .update_status(call_id, CallStatus::InProgress, &StatusUpdate::default())?;
        info!(call_id, "call started");
        self.emit(LifecycleEvent::Started {
            call_id: call_id.to_string(),
        });
        self.require(call_id)
    }

    /// InProgress → Completed, recording outcome notes.
    pub fn complete(&self, call_id: &str, outcome_notes: &str) -> Result<Call> {
        let call = self.require(call_id)?;
        self.check_edge(&call, CallStatus::InProgress, CallStatus::Completed)?;

        self.store.update_status(
            call_id,
            CallStatus::Completed,
            &StatusUpdate {
                notes: Some(outcome_notes.to_string()),
                scheduled_at: None,
            },
        )?;
        info!(call_id, "call completed");
        self.emit(LifecycleEvent::Finished {
            call_id: call_id.to_string(),
        });
        self.require(call_id)
    }

    /// InProgress → Failed, recording the reason.
    pub fn fail(&self, call_id: &str, reason: &str) -> Result<Call> {
        let call = self.require(call_id)?;
        self.check_edge(&call, CallStatus::InProgress, CallStatus::Failed)?;

        self.store.update_status(
            call_id,
            CallStatus::Failed,
            &StatusUpdate {
                notes: Some(reason.to_string()),
                scheduled_at: None,
            },
        )?;
        info!(call_id, reason, "call failed");
        self.emit(LifecycleEvent::Finished {
            call_id: call_id.to_string(),
        });
        self.require(call_id)
    }

    /// Scheduled → Scheduled with a new start time.
    ///
    /// The only legal way to move `scheduled_at`. Rescheduling an
    /// in-progress or finished call is an `InvalidTransition`.
    pub fn reschedule(&self, call_id: &str, new_time: DateTime<Utc>) -> Result<Call> {
        let call = self.require(call_id)?;
        self.check_edge(&call, CallStatus::Scheduled, CallStatus::Rescheduled)?;

        self.store.update_status(
            call_id,
            CallStatus::Scheduled,
            &StatusUpdate {
                notes: None,
                scheduled_at: Some(new_time),
            },
        )?;
        info!(call_id, new_time = %new_time.to_rfc3339(), "call rescheduled");
        self.emit(LifecycleEvent::Rescheduled {
            call_id: call_id.to_string(),
        });
        self.require(call_id)
    }

    /// Scheduled → Cancelled. Terminal.
    pub fn cancel(&self, call_id: &str) -> Result<Call> {
        let call = self.require(call_id)?;
        self.check_edge(&call, CallStatus::Scheduled, CallStatus::Cancelled)?;

        self.store
            .update_status(call_id, CallStatus::Cancelled, &StatusUpdate::default())?;
        info!(call_id, "call cancelled");
        self.emit(LifecycleEvent::Finished {
            call_id: call_id.to_string(),
        });
        self.require(call_id)
    }

    // --- private helpers ---------------------------------------------------

    fn require(&self, call_id: &str) -> Result<Call> {
        self.store.get(call_id)?.ok_or_else(|| CallError::NotFound {
            id: call_id.to_string(),
        })
    }

    fn check_edge(&self, call: &Call, expected_from: CallStatus, to: CallStatus) -> Result<()> {
        if call.status != expected_from {
            return Err(CallError::InvalidTransition {
                from: call.status,
                to,
            });
        }
        Ok(())
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Some(ref tx) = self.events_tx {
            // try_send never blocks the caller; a full queue means the
            // engine is behind and will observe the status on its next
            // fetch anyway.
            if tx.try_send(event.clone()).is_err() {
                warn!(call_id = event.call_id(), "lifecycle event queue full or closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::store::SqliteCallStore;
    use chrono::Duration;
    use rusqlite::Connection;

    fn fixture(events: Option<mpsc::Sender<LifecycleEvent>>) -> (CallLifecycle, String) {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let store = Arc::new(SqliteCallStore::new(conn));
        let call = Call::new("alice", "Acme", "screening", Utc::now() + Duration::minutes(20), 30);
        store.create(&call).unwrap();
        (CallLifecycle::new(store, events), call.id)
    }

    #[test]
    fn start_complete_happy_path() {
        let (lc, id) = fixture(None);
        assert_eq!(lc.start(&id).unwrap().status, CallStatus::InProgress);
        let done = lc.complete(&id, "offer extended").unwrap();
        assert_eq!(done.status, CallStatus::Completed);
        assert_eq!(done.notes.as_deref(), Some("offer extended"));
    }

    #[test]
    fn start_fail_records_reason() {
        let (lc, id) = fixture(None);
        lc.start(&id).unwrap();
        let failed = lc.fail(&id, "no answer").unwrap();
        assert_eq!(failed.status, CallStatus::Failed);
        assert_eq!(failed.notes.as_deref(), Some("no answer"));
    }

    #[test]
    fn complete_without_start_is_invalid() {
        let (lc, id) = fixture(None);
        let err = lc.complete(&id, "x").unwrap_err();
        assert!(matches!(
            err,
            CallError::InvalidTransition {
                from: CallStatus::Scheduled,
                to: CallStatus::Completed,
            }
        ));
    }

    #[test]
    fn reschedule_in_progress_is_invalid() {
        let (lc, id) = fixture(None);
        lc.start(&id).unwrap();
        let err = lc.reschedule(&id, Utc::now() + Duration::hours(1)).unwrap_err();
        assert!(matches!(
            err,
            CallError::InvalidTransition {
                from: CallStatus::InProgress,
                to: CallStatus::Rescheduled,
            }
        ));
    }

    #[test]
    fn reschedule_reenters_scheduled_with_new_time() {
        let (lc, id) = fixture(None);
        let new_time = Utc::now() + Duration::hours(2);
        let call = lc.reschedule(&id, new_time).unwrap();
        assert_eq!(call.status, CallStatus::Scheduled);
        assert_eq!(call.scheduled_at.to_rfc3339(), new_time.to_rfc3339());
    }

    #[test]
    fn cancel_is_terminal() {
        let (lc, id) = fixture(None);
        lc.cancel(&id).unwrap();
        let err = lc.start(&id).unwrap_err();
        assert!(matches!(err, CallError::InvalidTransition { .. }));
    }

    #[test]
    fn transitions_emit_invalidation_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let (lc, id) = fixture(Some(tx));

        lc.start(&id).unwrap();
        lc.complete(&id, "done").unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            LifecycleEvent::Started { call_id: id.clone() }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            LifecycleEvent::Finished { call_id: id }
        );
    }

    #[test]
    fn unknown_call_is_not_found() {
        let (lc, _) = fixture(None);
        assert!(matches!(
            lc.start("missing").unwrap_err(),
            CallError::NotFound { .. }
        ));
    }
}
