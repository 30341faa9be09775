use std::collections::HashMap;

use tracing::{info, warn};

use crate::{
    sink::NotificationSink,
    types::{Notification, SinkStatus},
};

/// Manages a collection of delivery adapters.
///
/// Sinks are stored by their [`NotificationSink::name`]. Fan-out is
/// sequential per notification; a failing sink is logged and skipped so
/// the remaining sinks still receive the reminder.
pub struct SinkManager {
    sinks: HashMap<String, Box<dyn NotificationSink>>,
}

impl SinkManager {
    /// Create an empty manager with no registered sinks.
    pub fn new() -> Self {
        Self {
            sinks: HashMap::new(),
        }
    }

    /// Register a sink adapter.
    ///
    /// If a sink with the same name is already registered it is replaced.
    pub fn register(&mut self, sink: Box<dyn NotificationSink>) {
        let name = sink.name().to_string();
        info!(sink = %name, "registering notification sink");
        self.sinks.insert(name, sink);
    }

    /// Deliver `note` to every registered sink.
    ///
    /// Errors never propagate: at-least-once delivery means the engine
    /// must not treat a sink failure as a reason to re-arm the trigger.
    pub async fn deliver_all(&self, note: &Notification) {
        for (name, sink) in self.sinks.iter() {
            if let Err(e) = sink.deliver(note).await {
                warn!(sink = %name, call_id = %note.call_id, error = %e, "sink delivery failed");
            }
        }
    }

    /// Return the current [`SinkStatus`] for every registered sink.
    ///
    /// The returned `Vec` is sorted by sink name for deterministic output.
    pub fn statuses(&self) -> Vec<(String, SinkStatus)> {
        let mut result: Vec<(String, SinkStatus)> = self
            .sinks
            .iter()
            .map(|(name, s)| (name.clone(), s.status()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Default for SinkManager {
    fn default() -> Self {
        Self::new()
    }
}
