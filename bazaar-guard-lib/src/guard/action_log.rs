//! Bounded per-(user, action type) history of recent actions.

use ahash::AHashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::action::{ActionRecord, ActionType, Payload, UserId};
use super::lock;

type ActionKey = (UserId, ActionType);

/// Ring buffers of recent [`ActionRecord`]s keyed by user and action type.
///
/// Each buffer holds at most `capacity` records; appending past that evicts
/// the oldest record (FIFO).
pub struct ActionLog {
    entries: Mutex<AHashMap<ActionKey, VecDeque<ActionRecord>>>,
    capacity: usize,
}

impl ActionLog {
    /// Create a log keeping at most `capacity` records per key.
    ///
    /// A zero capacity is raised to one so the newest record is always visible.
    pub fn new(capacity: usize) -> Self {
        Self { entries: Mutex::new(AHashMap::new()), capacity: capacity.max(1) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an action stamped with the current instant.
    pub fn record(&self, user: &UserId, action: &ActionType, payload: Payload) {
        self.record_then(user, action, payload, |_| ());
    }

    /// Append an action and inspect the updated history under the same lock.
    ///
    /// The closure sees the buffer oldest-first, newest record last.
    pub fn record_then<R>(
        &self,
        user: &UserId,
        action: &ActionType,
        payload: Payload,
        inspect: impl FnOnce(&VecDeque<ActionRecord>) -> R,
    ) -> R {
        let mut entries = lock(&self.entries, "action log");
        let buffer = entries
            .entry((user.clone(), action.clone()))
            .or_insert_with(|| VecDeque::with_capacity(self.capacity.min(16)));

        buffer.push_back(ActionRecord::new(Instant::now(), payload));
        while buffer.len() > self.capacity {
            buffer.pop_front();
        }

        inspect(buffer)
    }

    /// Recent records for `(user, action)`, oldest first. Empty if none.
    pub fn history(&self, user: &UserId, action: &ActionType) -> Vec<ActionRecord> {
        let entries = lock(&self.entries, "action log");
        entries
            .get(&(user.clone(), action.clone()))
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every entry whose newest record is older than `max_idle`.
    ///
    /// Returns the number of entries removed.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut entries = lock(&self.entries, "action log");
        let before = entries.len();
        entries.retain(|_, buffer| {
            buffer
                .back()
                .is_some_and(|newest| now.saturating_duration_since(newest.at) < max_idle)
        });
        before.saturating_sub(entries.len())
    }

    /// Number of tracked (user, action type) entries.
    pub fn len(&self) -> usize {
        lock(&self.entries, "action log").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
