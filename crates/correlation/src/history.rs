//! Shared match histories backing time-window correlation.
//!
//! A history is created lazily the first time something subscribes to a
//! rule and is handed around as `Arc<MatchHistory>`. The handle outlives
//! the rule generation it was wired in: subscribers keep it alive by
//! reference count, never by copying the events.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use loghound_core::Event;

/// Growable list of events a rule has matched, shared between the matched
/// rule and every rule correlating against it.
#[derive(Debug, Default)]
pub struct MatchHistory {
    events: RwLock<Vec<Arc<Event>>>,
}

impl MatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Arc<Event>) {
        self.events
            .write()
            .expect("history lock poisoned")
            .push(event);
    }

    pub fn len(&self) -> usize {
        self.events.read().expect("history lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current contents as shared handles, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<Event>> {
        self.events.read().expect("history lock poisoned").clone()
    }

    pub fn clear(&self) {
        self.events.write().expect("history lock poisoned").clear();
    }

    /// Drop events older than the cutoff, returning how many were removed.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut events = self.events.write().expect("history lock poisoned");
        let before = events.len();
        events.retain(|event| event.timestamp >= cutoff);
        before - events.len()
    }
}
