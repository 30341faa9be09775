use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use switchboard_calls::{Call, CallStatus};

use crate::types::{NotificationTrigger, TriggerKind};

/// Per-call trigger bookkeeping.
#[derive(Debug, Default)]
struct CallTriggers {
    /// Offsets that fired or lapsed; either way they never fire again
    /// for this call until the entry is cleared.
    spent: HashSet<i64>,
    /// Pending one-shot snooze re-fire.
    snooze_at: Option<DateTime<Utc>>,
}

/// Engine-owned trigger state for one viewer session.
///
/// All mutation happens on the engine task, which makes the
/// check-and-set on the spent set atomic with respect to ticks and
/// user commands. Nothing here is persisted; a restart simply
/// re-evaluates from the current clock.
#[derive(Debug, Default)]
pub struct TriggerLedger {
    entries: HashMap<String, CallTriggers>,
}

impl TriggerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one call against the offset ladder at `now`, returning
    /// any triggers that fire this pass (0, 1, or 2 — an offset fire
    /// and a snooze fire can coincide).
    ///
    /// `ladder` must be sorted descending. Firing rules:
    ///
    /// - Scheduled: among unspent offsets whose time has arrived
    ///   (`offset >= minutes_until >= 0`), fire the smallest and lapse
    ///   the rest. An exact match is the degenerate case; the lapse
    ///   branch is the catch-up policy for skipped ticks — one reminder
    ///   after a wake-up, never a burst of stale ones.
    /// - InProgress: only offset 0 stays eligible, on the same rule.
    /// - Terminal (or `Rescheduled` observed from an external writer):
    ///   drop the entry, fire nothing.
    pub fn evaluate(&mut self, call: &Call, ladder: &[i64], now: DateTime<Utc>) -> Vec<NotificationTrigger> {
        match call.status {
            CallStatus::Scheduled => {
                let mut fired = self.fire_due(call, ladder, now);
                if let Some(trigger) = self.fire_snooze(call, now) {
                    fired.push(trigger);
                }
                fired
            }
            CallStatus::InProgress => {
                // The call is underway: future-offset reminders are
                // meaningless, but "starting now" still fires once.
                let entry = self.entries.entry(call.id.clone()).or_default();
                for offset in ladder.iter().filter(|o| **o != 0) {
                    entry.spent.insert(*offset);
                }
                entry.snooze_at = None;
                self.fire_due(call, &[0], now)
            }
            _ => {
                self.entries.remove(&call.id);
                Vec::new()
            }
        }
    }

    /// Schedule a one-shot re-fire for `call_id` at `now + minutes`,
    /// replacing any earlier pending snooze.
    pub fn snooze(&mut self, call_id: &str, minutes: i64, now: DateTime<Utc>) {
        let entry = self.entries.entry(call_id.to_string()).or_default();
        entry.snooze_at = Some(now + chrono::Duration::minutes(minutes.max(0)));
        debug!(call_id, minutes, "snooze armed");
    }

    /// Cancel any pending snooze re-fire. Fired offsets stay spent so
    /// dismissal never causes a ladder repeat.
    pub fn dismiss(&mut self, call_id: &str) {
        if let Some(entry) = self.entries.get_mut(call_id) {
            entry.snooze_at = None;
        }
    }

    /// Drop all trigger state for a call. Used when the call finished,
    /// was cancelled, or was rescheduled (the new time is evaluated
    /// from a clean slate on the next pass).
    pub fn clear(&mut self, call_id: &str) {
        self.entries.remove(call_id);
    }

    /// Void every non-zero offset for a started call while keeping the
    /// "starting now" reminder eligible.
    pub fn suppress_future(&mut self, call_id: &str, ladder: &[i64]) {
        let entry = self.entries.entry(call_id.to_string()).or_default();
        for offset in ladder.iter().filter(|o| **o != 0) {
            entry.spent.insert(*offset);
        }
        entry.snooze_at = None;
    }

    /// Garbage-collect entries for calls no longer in `keep` — deleted,
    /// revoked out of the visible set, or terminal.
    pub fn retain_calls(&mut self, keep: &HashSet<String>) {
        let before = self.entries.len();
        self.entries.retain(|call_id, _| keep.contains(call_id));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!(dropped, "garbage-collected trigger entries");
        }
    }

    /// Number of calls with live trigger state.
    pub fn tracked_calls(&self) -> usize {
        self.entries.len()
    }

    // --- private helpers ---------------------------------------------------

    fn fire_due(&mut self, call: &Call, ladder: &[i64], now: DateTime<Utc>) -> Vec<NotificationTrigger> {
        let minutes_until = minutes_until(call, now);
        if minutes_until < 0 {
            return Vec::new();
        }

        let entry = self.entries.entry(call.id.clone()).or_default();
        let mut due: Vec<i64> = ladder
            .iter()
            .copied()
            .filter(|o| *o >= minutes_until && !entry.spent.contains(o))
            .collect();
        if due.is_empty() {
            return Vec::new();
        }

        // Smallest due offset is the freshest; older ones lapse silently.
        due.sort_unstable();
        let fire = due[0];
        for lapsed in &due[1..] {
            entry.spent.insert(*lapsed);
            debug!(call_id = %call.id, offset = lapsed, "offset lapsed without firing");
        }
        entry.spent.insert(fire);

        vec![NotificationTrigger {
            call_id: call.id.clone(),
            offset_minutes: fire,
            kind: TriggerKind::Offset,
            fired_at: now,
        }]
    }

    fn fire_snooze(&mut self, call: &Call, now: DateTime<Utc>) -> Option<NotificationTrigger> {
        let entry = self.entries.get_mut(&call.id)?;
        let due_at = entry.snooze_at?;
        if due_at > now {
            return None;
        }
        // One-shot: disarm before reporting so later ticks never repeat it.
        entry.snooze_at = None;
        Some(NotificationTrigger {
            call_id: call.id.clone(),
            offset_minutes: minutes_until(call, now).max(0),
            kind: TriggerKind::Snooze,
            fired_at: now,
        })
    }
}

/// Whole minutes until the call's start, floored: a call 30 s before
/// its start is at 0, a call 30 s past it is at -1.
fn minutes_until(call: &Call, now: DateTime<Utc>) -> i64 {
    (call.scheduled_at - now).num_seconds().div_euclid(60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const LADDER: [i64; 5] = [15, 10, 5, 1, 0];

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn call_at(minutes: i64) -> Call {
        Call::new("viewer", "Acme HR", "screening", base() + Duration::minutes(minutes), 30)
    }

    fn offsets(fired: &[NotificationTrigger]) -> Vec<i64> {
        fired.iter().map(|t| t.offset_minutes).collect()
    }

    #[test]
    fn exact_match_fires_once_per_offset() {
        let mut ledger = TriggerLedger::new();
        let call = call_at(16);

        let mut all = Vec::new();
        for minute in 0..=17 {
            let now = base() + Duration::minutes(minute);
            all.extend(ledger.evaluate(&call, &LADDER, now));
        }
        assert_eq!(offsets(&all), vec![15, 10, 5, 1, 0]);
    }

    #[test]
    fn no_fire_between_offsets() {
        let mut ledger = TriggerLedger::new();
        let call = call_at(15);

        // minutes_until == 15: fires.
        let fired = ledger.evaluate(&call, &LADDER, base());
        assert_eq!(offsets(&fired), vec![15]);

        // Every tick until minutes_until == 10 stays quiet.
        for minute in 1..5 {
            let now = base() + Duration::minutes(minute);
            assert!(ledger.evaluate(&call, &LADDER, now).is_empty());
        }
        let fired = ledger.evaluate(&call, &LADDER, base() + Duration::minutes(5));
        assert_eq!(offsets(&fired), vec![10]);
    }

    #[test]
    fn same_tick_twice_fires_once() {
        let mut ledger = TriggerLedger::new();
        let call = call_at(15);

        assert_eq!(ledger.evaluate(&call, &LADDER, base()).len(), 1);
        assert!(ledger.evaluate(&call, &LADDER, base()).is_empty());
    }

    #[test]
    fn skipped_ticks_fire_newest_missed_offset_only() {
        let mut ledger = TriggerLedger::new();
        let call = call_at(16);

        // First tick at 16-to-go: nothing due yet.
        assert!(ledger.evaluate(&call, &LADDER, base()).is_empty());

        // Process slept through 15 and 10; wakes at 7-to-go.
        let fired = ledger.evaluate(&call, &LADDER, base() + Duration::minutes(9));
        assert_eq!(offsets(&fired), vec![10]);

        // 15 lapsed: it never fires, even on later ticks.
        for minute in 10..=16 {
            let now = base() + Duration::minutes(minute);
            let fired = ledger.evaluate(&call, &LADDER, now);
            assert!(!offsets(&fired).contains(&15));
        }
    }

    #[test]
    fn past_start_fires_nothing() {
        let mut ledger = TriggerLedger::new();
        let call = call_at(-1);
        assert!(ledger.evaluate(&call, &LADDER, base()).is_empty());
    }

    #[test]
    fn in_progress_keeps_only_offset_zero() {
        let mut ledger = TriggerLedger::new();
        let mut call = call_at(16);

        // 15 fires normally.
        ledger.evaluate(&call, &LADDER, base() + Duration::minutes(1));
        // Call starts early.
        call.status = CallStatus::InProgress;

        // 10, 5, 1 are suppressed on every subsequent tick.
        for minute in 2..16 {
            let now = base() + Duration::minutes(minute);
            assert!(ledger.evaluate(&call, &LADDER, now).is_empty());
        }
        // Offset 0 still fires once at the scheduled start.
        let fired = ledger.evaluate(&call, &LADDER, base() + Duration::minutes(16));
        assert_eq!(offsets(&fired), vec![0]);
        assert!(ledger
            .evaluate(&call, &LADDER, base() + Duration::minutes(16))
            .is_empty());
    }

    #[test]
    fn terminal_status_drops_entry_and_fires_nothing() {
        let mut ledger = TriggerLedger::new();
        let mut call = call_at(6);

        // Builds state at 6-to-go (catch-up fires 10).
        ledger.evaluate(&call, &LADDER, base());
        assert_eq!(ledger.tracked_calls(), 1);

        call.status = CallStatus::Completed;
        let fired = ledger.evaluate(&call, &LADDER, base() + Duration::minutes(1));
        assert!(fired.is_empty());
        assert_eq!(ledger.tracked_calls(), 0);
    }

    #[test]
    fn snooze_fires_exactly_once_at_synthetic_time() {
        let mut ledger = TriggerLedger::new();
        let call = call_at(30);

        ledger.snooze(&call.id, 3, base());

        // Before the snooze time: quiet.
        assert!(ledger
            .evaluate(&call, &LADDER, base() + Duration::minutes(2))
            .is_empty());

        let fired = ledger.evaluate(&call, &LADDER, base() + Duration::minutes(3));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, TriggerKind::Snooze);

        // One-shot: later ticks never repeat it.
        for minute in 4..10 {
            let now = base() + Duration::minutes(minute);
            assert!(ledger.evaluate(&call, &LADDER, now).is_empty());
        }
    }

    #[test]
    fn dismiss_cancels_pending_snooze_but_keeps_spent_offsets() {
        let mut ledger = TriggerLedger::new();
        let call = call_at(15);

        let fired = ledger.evaluate(&call, &LADDER, base());
        assert_eq!(offsets(&fired), vec![15]);

        ledger.snooze(&call.id, 2, base());
        ledger.dismiss(&call.id);

        // Snooze never fires; 15 does not repeat.
        for minute in 1..5 {
            let now = base() + Duration::minutes(minute);
            assert!(ledger.evaluate(&call, &LADDER, now).is_empty());
        }
    }

    #[test]
    fn clear_resets_ladder_for_reschedule() {
        let mut ledger = TriggerLedger::new();
        let mut call = call_at(15);

        let fired = ledger.evaluate(&call, &LADDER, base());
        assert_eq!(offsets(&fired), vec![15]);

        // Rescheduled to 15 minutes later: entry cleared, 15 re-arms.
        ledger.clear(&call.id);
        call.scheduled_at = base() + Duration::minutes(30);
        let fired = ledger.evaluate(&call, &LADDER, base() + Duration::minutes(15));
        assert_eq!(offsets(&fired), vec![15]);
    }

    #[test]
    fn retain_drops_vanished_calls() {
        let mut ledger = TriggerLedger::new();
        let call = call_at(15);
        ledger.evaluate(&call, &LADDER, base());
        assert_eq!(ledger.tracked_calls(), 1);

        ledger.retain_calls(&HashSet::new());
        assert_eq!(ledger.tracked_calls(), 0);
    }
}
