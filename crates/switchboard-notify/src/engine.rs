use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use switchboard_calls::{CallStatus, LifecycleEvent, VisibleCallSet};
use switchboard_core::config::NotifyConfig;
use switchboard_sinks::{Notification, SinkManager};

use crate::error::{NotifyError, Result};
use crate::ledger::TriggerLedger;
use crate::types::{NotifyCommand, TriggerEvent, TriggerKind};

/// Shared handle for user actions while the engine loop runs.
///
/// All mutation of trigger state goes through this queue; request
/// handlers never touch the ledger directly.
#[derive(Clone)]
pub struct NotifyHandle {
    commands_tx: mpsc::Sender<NotifyCommand>,
}

impl NotifyHandle {
    /// Snooze the call's reminder: clear the display and re-fire once
    /// after `minutes`.
    pub fn snooze(&self, call_id: &str, minutes: i64) -> Result<()> {
        self.send(NotifyCommand::Snooze {
            call_id: call_id.to_string(),
            minutes,
        })
    }

    /// Dismiss the call's reminder, cancelling any pending snooze.
    pub fn dismiss(&self, call_id: &str) -> Result<()> {
        self.send(NotifyCommand::Dismiss {
            call_id: call_id.to_string(),
        })
    }

    fn send(&self, cmd: NotifyCommand) -> Result<()> {
        self.commands_tx.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotifyError::EngineStopped,
        })
    }
}

/// Per-viewer reminder engine.
///
/// Owns the trigger ledger exclusively; ticks, user commands, and
/// lifecycle events are all applied on the engine task, which is what
/// makes the fire-once check-and-set safe without further locking.
pub struct NotifyEngine {
    viewer_id: String,
    visible: VisibleCallSet,
    sinks: Arc<SinkManager>,
    ladder: Vec<i64>,
    poll: std::time::Duration,
    ledger: TriggerLedger,
    commands_rx: mpsc::Receiver<NotifyCommand>,
    lifecycle_rx: mpsc::Receiver<LifecycleEvent>,
    // Kept so the receivers never observe a fully-closed channel even
    // if the embedder drops every handle; `recv()` returning `None`
    // inside the select loop would spin.
    _commands_tx: mpsc::Sender<NotifyCommand>,
    _lifecycle_tx: mpsc::Sender<LifecycleEvent>,
}

impl NotifyEngine {
    /// Build an engine for `viewer_id`.
    ///
    /// Returns the engine, the user-action handle, and the lifecycle
    /// event sender to attach to a `CallLifecycle`.
    pub fn new(
        viewer_id: impl Into<String>,
        visible: VisibleCallSet,
        sinks: Arc<SinkManager>,
        config: &NotifyConfig,
    ) -> (Self, NotifyHandle, mpsc::Sender<LifecycleEvent>) {
        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(64);

        let engine = Self {
            viewer_id: viewer_id.into(),
            visible,
            sinks,
            ladder: config.ladder(),
            poll: std::time::Duration::from_secs(config.poll_secs.max(1)),
            ledger: TriggerLedger::new(),
            commands_rx,
            lifecycle_rx,
            _commands_tx: commands_tx.clone(),
            _lifecycle_tx: lifecycle_tx.clone(),
        };
        (
            engine,
            NotifyHandle { commands_tx },
            lifecycle_tx,
        )
    }

    /// Main event loop. Evaluates immediately on start, then once per
    /// poll interval, until `shutdown` broadcasts `true`.
    ///
    /// Tearing the loop down on viewer switch (logout) is the
    /// embedder's job via the shutdown channel — a leaked loop would
    /// keep delivering reminders for a session no longer active.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(viewer_id = %self.viewer_id, "notification engine started");
        self.pass_at(Utc::now()).await;

        let start = tokio::time::Instant::now() + self.poll;
        let mut interval = tokio::time::interval_at(start, self.poll);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.pass_at(Utc::now()).await;
                }
                Some(cmd) = self.commands_rx.recv() => {
                    self.apply_command(cmd, Utc::now());
                }
                Some(event) = self.lifecycle_rx.recv() => {
                    self.apply_lifecycle(event);
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(viewer_id = %self.viewer_id, "notification engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One full evaluation pass: drain queues, compute fires, deliver.
    ///
    /// Public so embedders (and the integration tests) can drive time
    /// themselves instead of waiting on the interval.
    pub async fn pass_at(&mut self, now: DateTime<Utc>) {
        let fired = self.tick_at(now);
        for event in fired {
            let note = self.to_notification(&event);
            self.sinks.deliver_all(&note).await;
        }
    }

    /// Evaluate without delivering; returns the triggers that fired.
    ///
    /// Fetch-then-compute: the only I/O is the visible-call fetch up
    /// front, and a failed fetch skips the pass rather than stopping
    /// the loop.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<TriggerEvent> {
        self.drain_pending(now);

        let calls = match self
            .visible
            .visible_calls(&self.viewer_id, &[CallStatus::Scheduled, CallStatus::InProgress])
        {
            Ok(calls) => calls,
            Err(e) => {
                warn!(viewer_id = %self.viewer_id, error = %e,
                      "visible-call fetch failed; retrying next tick");
                return Vec::new();
            }
        };

        // Calls that vanished from the view (deleted, revoked, terminal)
        // take their trigger state with them.
        let keep: HashSet<String> = calls.iter().map(|c| c.id.clone()).collect();
        self.ledger.retain_calls(&keep);

        let mut fired = Vec::new();
        for call in &calls {
            for trigger in self.ledger.evaluate(call, &self.ladder, now) {
                info!(
                    viewer_id = %self.viewer_id,
                    call_id = %trigger.call_id,
                    offset = trigger.offset_minutes,
                    snoozed = trigger.kind == TriggerKind::Snooze,
                    "reminder fired"
                );
                fired.push(TriggerEvent {
                    trigger,
                    call: call.clone(),
                });
            }
        }
        fired
    }

    /// Number of calls the ledger currently tracks (observability).
    pub fn tracked_calls(&self) -> usize {
        self.ledger.tracked_calls()
    }

    // --- private helpers ---------------------------------------------------

    /// Apply queued commands and lifecycle events ahead of evaluation,
    /// so a snooze or completion submitted between ticks takes effect
    /// on this pass, not the next.
    fn drain_pending(&mut self, now: DateTime<Utc>) {
        while let Ok(cmd) = self.commands_rx.try_recv() {
            self.apply_command(cmd, now);
        }
        while let Ok(event) = self.lifecycle_rx.try_recv() {
            self.apply_lifecycle(event);
        }
    }

    fn apply_command(&mut self, cmd: NotifyCommand, now: DateTime<Utc>) {
        match cmd {
            NotifyCommand::Snooze { call_id, minutes } => {
                info!(viewer_id = %self.viewer_id, call_id, minutes, "reminder snoozed");
                self.ledger.snooze(&call_id, minutes, now);
            }
            NotifyCommand::Dismiss { call_id } => {
                debug!(viewer_id = %self.viewer_id, call_id, "reminder dismissed");
                self.ledger.dismiss(&call_id);
            }
        }
    }

    fn apply_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Started { call_id } => {
                debug!(call_id, "call started; voiding future offsets");
                self.ledger.suppress_future(&call_id, &self.ladder);
            }
            LifecycleEvent::Finished { call_id } | LifecycleEvent::Rescheduled { call_id } => {
                debug!(call_id, "call left schedule; clearing triggers");
                self.ledger.clear(&call_id);
            }
        }
    }

    fn to_notification(&self, event: &TriggerEvent) -> Notification {
        Notification {
            call_id: event.call.id.clone(),
            viewer_id: self.viewer_id.clone(),
            offset_minutes: event.trigger.offset_minutes,
            snoozed: event.trigger.kind == TriggerKind::Snooze,
            subject: event.call.subject.clone(),
            contact: event.call.contact.clone(),
            scheduled_at: event.call.scheduled_at,
            fired_at: event.trigger.fired_at,
        }
    }
}
