//! `switchboard-sinks` — reminder delivery adapters.
//!
//! The engine hands every fired reminder to a [`SinkManager`], which
//! fans it out to registered [`NotificationSink`] implementations.
//! Delivery is at-least-once: a sink failure is logged and never rolls
//! back trigger state, because re-delivering a reminder beats silently
//! losing one.

pub mod console;
pub mod error;
pub mod manager;
pub mod sink;
pub mod types;

pub use console::ConsoleSink;
pub use error::SinkError;
pub use manager::SinkManager;
pub use sink::NotificationSink;
pub use types::{Notification, SinkStatus};
