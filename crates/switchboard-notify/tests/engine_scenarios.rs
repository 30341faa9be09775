//! End-to-end scenarios: permission grants feeding the reminder engine,
//! lifecycle-driven suppression, and sink delivery.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;

use switchboard_calls::{
    Call, CallLifecycle, CallStore, SqliteCallStore, VisibleCallSet,
};
use switchboard_core::config::NotifyConfig;
use switchboard_core::types::UserRole;
use switchboard_notify::{NotifyEngine, NotifyHandle, TriggerKind};
use switchboard_sinks::{Notification, NotificationSink, SinkError, SinkManager, SinkStatus};
use switchboard_users::{db as users_db, PermissionRegistry};

struct World {
    engine: NotifyEngine,
    handle: NotifyHandle,
    lifecycle: CallLifecycle,
    registry: Arc<PermissionRegistry>,
    store: Arc<SqliteCallStore>,
    admin: String,
    caller: String,
    owner: String,
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn world_with_sinks(sinks: SinkManager) -> World {
    let users_conn = Connection::open_in_memory().unwrap();
    users_db::init_db(&users_conn).unwrap();
    let admin = users_db::create_user(&users_conn, "root", UserRole::Admin).unwrap();
    let caller = users_db::create_user(&users_conn, "carol", UserRole::Caller).unwrap();
    let owner = users_db::create_user(&users_conn, "owen", UserRole::Standard).unwrap();
    let registry = Arc::new(PermissionRegistry::new(users_conn));

    let calls_conn = Connection::open_in_memory().unwrap();
    switchboard_calls::db::init_db(&calls_conn).unwrap();
    let store = Arc::new(SqliteCallStore::new(calls_conn));

    let visible = VisibleCallSet::new(registry.clone(), store.clone());
    let (engine, handle, lifecycle_tx) = NotifyEngine::new(
        caller.id.clone(),
        visible,
        Arc::new(sinks),
        &NotifyConfig::default(),
    );
    let lifecycle = CallLifecycle::new(store.clone(), Some(lifecycle_tx));

    World {
        engine,
        handle,
        lifecycle,
        registry,
        store,
        admin: admin.id,
        caller: caller.id,
        owner: owner.id,
    }
}

fn world() -> World {
    world_with_sinks(SinkManager::new())
}

fn grant(world: &World) -> String {
    let summary = world
        .registry
        .grant(&world.caller, &[world.owner.clone()], &world.admin)
        .unwrap();
    summary.created[0].id.clone()
}

fn owner_call_at(world: &World, minutes: i64) -> Call {
    let call = Call::new(
        world.owner.clone(),
        "Acme HR",
        "screening",
        base() + Duration::minutes(minutes),
        30,
    );
    world.store.create(&call).unwrap();
    call
}

#[test]
fn granted_call_walks_full_ladder_then_revoke_garbage_collects() {
    let mut w = world();
    let grant_id = grant(&w);
    let call = owner_call_at(&w, 16);

    // Minute-granularity ticks up to 9-to-go: 15 and 10 fire exactly once.
    let mut fired = Vec::new();
    for minute in 0..=7 {
        let now = base() + Duration::minutes(minute);
        fired.extend(w.engine.tick_at(now));
    }
    let offsets: Vec<i64> = fired.iter().map(|e| e.trigger.offset_minutes).collect();
    assert_eq!(offsets, vec![15, 10]);
    assert!(fired.iter().all(|e| e.trigger.call_id == call.id));
    assert_eq!(w.engine.tracked_calls(), 1);

    // Revoke: on the next pass the call disappears from the view and
    // its residual trigger state goes with it.
    w.registry.revoke(&grant_id).unwrap();
    let fired = w.engine.tick_at(base() + Duration::minutes(8));
    assert!(fired.is_empty());
    assert_eq!(w.engine.tracked_calls(), 0);

    // The remaining ladder never fires.
    for minute in 9..=17 {
        assert!(w.engine.tick_at(base() + Duration::minutes(minute)).is_empty());
    }
}

#[test]
fn full_ladder_fires_each_offset_exactly_once() {
    let mut w = world();
    grant(&w);
    owner_call_at(&w, 16);

    let mut offsets = Vec::new();
    for minute in 0..=17 {
        let now = base() + Duration::minutes(minute);
        offsets.extend(
            w.engine
                .tick_at(now)
                .iter()
                .map(|e| e.trigger.offset_minutes),
        );
    }
    assert_eq!(offsets, vec![15, 10, 5, 1, 0]);
}

#[test]
fn completing_a_call_suppresses_its_pending_offsets() {
    let mut w = world();
    grant(&w);
    let call = owner_call_at(&w, 16);

    for minute in 0..=6 {
        w.engine.tick_at(base() + Duration::minutes(minute));
    }

    // 6-to-go: the call wraps up early. The 5-minute reminder is still
    // pending but must never fire.
    w.lifecycle.start(&call.id).unwrap();
    w.lifecycle.complete(&call.id, "offer extended").unwrap();

    for minute in 10..=17 {
        let fired = w.engine.tick_at(base() + Duration::minutes(minute));
        assert!(fired.is_empty(), "fired at minute {minute}: {fired:?}");
    }
    assert_eq!(w.engine.tracked_calls(), 0);
}

#[test]
fn started_call_still_gets_the_starting_now_reminder() {
    let mut w = world();
    grant(&w);
    let call = owner_call_at(&w, 16);

    let fired = w.engine.tick_at(base() + Duration::minutes(1));
    assert_eq!(fired[0].trigger.offset_minutes, 15);

    // Caller jumps on the call 14 minutes early.
    w.lifecycle.start(&call.id).unwrap();

    // Future offsets (10, 5, 1) are void...
    for minute in 2..=15 {
        assert!(w.engine.tick_at(base() + Duration::minutes(minute)).is_empty());
    }
    // ...but the final confirmation at the scheduled start still fires once.
    let fired = w.engine.tick_at(base() + Duration::minutes(16));
    let offsets: Vec<i64> = fired.iter().map(|e| e.trigger.offset_minutes).collect();
    assert_eq!(offsets, vec![0]);
    assert!(w.engine.tick_at(base() + Duration::minutes(16)).is_empty());
}

#[test]
fn reschedule_reevaluates_against_the_new_time_only() {
    let mut w = world();
    grant(&w);
    let call = owner_call_at(&w, 5);

    // 5-to-go on the first pass: the 5-minute reminder fires (15/10 lapse).
    let fired = w.engine.tick_at(base());
    let offsets: Vec<i64> = fired.iter().map(|e| e.trigger.offset_minutes).collect();
    assert_eq!(offsets, vec![5]);

    // Candidate pushes the call out 15 minutes.
    w.lifecycle
        .reschedule(&call.id, base() + Duration::minutes(20))
        .unwrap();

    // Nothing fires until the new time's ladder comes due; then the
    // full ladder re-arms, 15 included.
    for minute in 1..=4 {
        assert!(w.engine.tick_at(base() + Duration::minutes(minute)).is_empty());
    }
    let fired = w.engine.tick_at(base() + Duration::minutes(5));
    let offsets: Vec<i64> = fired.iter().map(|e| e.trigger.offset_minutes).collect();
    assert_eq!(offsets, vec![15]);
}

#[test]
fn snooze_refires_once_outside_the_ladder() {
    let mut w = world();
    grant(&w);
    let call = owner_call_at(&w, 40);

    w.handle.snooze(&call.id, 3).unwrap();

    // Command drains on the next pass; the re-fire lands 3 minutes on.
    assert!(w.engine.tick_at(base()).is_empty());
    assert!(w.engine.tick_at(base() + Duration::minutes(2)).is_empty());

    let fired = w.engine.tick_at(base() + Duration::minutes(3));
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].trigger.kind, TriggerKind::Snooze);

    for minute in 4..=10 {
        assert!(w.engine.tick_at(base() + Duration::minutes(minute)).is_empty());
    }
}

#[test]
fn dismiss_cancels_a_pending_snooze() {
    let mut w = world();
    grant(&w);
    let call = owner_call_at(&w, 40);

    w.handle.snooze(&call.id, 2).unwrap();
    w.engine.tick_at(base());
    w.handle.dismiss(&call.id).unwrap();

    for minute in 1..=5 {
        assert!(w.engine.tick_at(base() + Duration::minutes(minute)).is_empty());
    }
}

#[test]
fn viewer_with_no_grants_still_sees_own_calls() {
    let mut w = world();
    // No grant: the caller's own call drives the ladder anyway.
    let call = Call::new(
        w.caller.clone(),
        "Widget Co",
        "follow-up",
        base() + Duration::minutes(15),
        15,
    );
    w.store.create(&call).unwrap();

    let fired = w.engine.tick_at(base());
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].trigger.offset_minutes, 15);
    assert_eq!(fired[0].call.id, call.id);
}

/// Collects delivered notifications for assertions.
struct CaptureSink {
    notes: Arc<Mutex<Vec<Notification>>>,
}

#[async_trait::async_trait]
impl NotificationSink for CaptureSink {
    fn name(&self) -> &str {
        "capture"
    }

    async fn deliver(&self, note: &Notification) -> Result<(), SinkError> {
        self.notes.lock().unwrap().push(note.clone());
        Ok(())
    }

    fn status(&self) -> SinkStatus {
        SinkStatus::Ready
    }
}

/// Always fails — delivery errors must not roll back trigger state.
struct FailingSink;

#[async_trait::async_trait]
impl NotificationSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _note: &Notification) -> Result<(), SinkError> {
        Err(SinkError::DeliveryFailed("surface unavailable".into()))
    }

    fn status(&self) -> SinkStatus {
        SinkStatus::Degraded("surface unavailable".into())
    }
}

#[tokio::test]
async fn fired_triggers_are_delivered_through_sinks() {
    let notes = Arc::new(Mutex::new(Vec::new()));
    let mut sinks = SinkManager::new();
    sinks.register(Box::new(CaptureSink {
        notes: notes.clone(),
    }));
    sinks.register(Box::new(FailingSink));

    let mut w = world_with_sinks(sinks);
    grant(&w);
    let call = owner_call_at(&w, 15);

    w.engine.pass_at(base()).await;

    let delivered = notes.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].call_id, call.id);
    assert_eq!(delivered[0].viewer_id, w.caller);
    assert_eq!(delivered[0].offset_minutes, 15);
    assert!(!delivered[0].snoozed);
    drop(delivered);

    // The failing sink did not re-arm the trigger: no duplicate on the
    // next pass.
    w.engine.pass_at(base() + Duration::minutes(1)).await;
    assert_eq!(notes.lock().unwrap().len(), 1);
}
