//! `switchboard-calls` — call records, their lifecycle state machine,
//! and the permission-filtered view the notification engine consumes.
//!
//! The store is the system's write/read boundary to the call data; the
//! lifecycle enforces legal status transitions and forwards
//! invalidation events to whichever notification engine is listening.

pub mod db;
pub mod error;
pub mod lifecycle;
pub mod store;
pub mod types;
pub mod visibility;

pub use error::{CallError, Result};
pub use lifecycle::{CallLifecycle, LifecycleEvent};
pub use store::{CallStore, SqliteCallStore, StatusUpdate};
pub use types::{Call, CallPriority, CallStatus};
pub use visibility::VisibleCallSet;
