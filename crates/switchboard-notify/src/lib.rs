//! `switchboard-notify` — the call reminder engine.
//!
//! # Overview
//!
//! One [`engine::NotifyEngine`] runs per viewer session. Each pass it
//! fetches the viewer's visible calls, computes minutes-until-start for
//! every scheduled call, and fires each ladder offset exactly once per
//! call, delivering through the registered sinks. Snooze and dismiss
//! arrive as commands over the engine's queue; lifecycle changes
//! (start/complete/fail/reschedule/cancel) arrive as events from
//! `switchboard-calls` and invalidate pending triggers.
//!
//! # Trigger rules
//!
//! | Situation                         | Behaviour                                    |
//! |-----------------------------------|----------------------------------------------|
//! | `minutes_until == offset`         | Fire once, never again for that pair         |
//! | Tick skipped past an offset       | Fire the most recent missed offset, lapse older ones |
//! | Call started                      | Future offsets void; offset 0 may still fire |
//! | Call finished/cancelled           | All pending triggers void                    |
//! | Call rescheduled                  | Ledger entry reset; new time evaluated fresh |
//! | Snooze(n)                         | One-shot re-fire at now+n, outside the ladder |

pub mod engine;
pub mod error;
pub mod ledger;
pub mod types;

pub use engine::{NotifyEngine, NotifyHandle};
pub use error::{NotifyError, Result};
pub use ledger::TriggerLedger;
pub use types::{NotificationTrigger, NotifyCommand, TriggerEvent, TriggerKind};
