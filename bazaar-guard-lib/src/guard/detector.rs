//! Heuristic classification of bot-like behavior.
//!
//! Three heuristics run against the history of a single (user, action type)
//! pair, in a fixed priority order. The first one that matches decides the
//! [`Detection`]:
//!
//! 1. **Too fast**: the last `too_fast_actions` records span less than
//!    `too_fast_window_ms`.
//! 2. **Exact repetition**: the last `repetition_actions` payloads are all
//!    structurally equal.
//! 3. **High frequency**: more records inside the trailing frequency window
//!    than the ceiling of the action type.
//!
//! Every detection made through [`SuspicionDetector::evaluate`] is also kept as
//! a [`SuspicionEvent`] for the admin monitor. The event list is bounded by
//! count and by age.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::action::{ActionRecord, ActionType, UserId};
use super::lock;
use crate::config::DetectorConfig;

/// Kind of suspicious pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternKind {
    TooFast,
    ExactRepetition,
    HighFrequency,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::TooFast => "TOO_FAST",
            PatternKind::ExactRepetition => "EXACT_REPETITION",
            PatternKind::HighFrequency => "HIGH_FREQUENCY",
        }
    }

    /// Human readable reason shown to the user when an action is refused.
    pub fn description(&self) -> &'static str {
        match self {
            PatternKind::TooFast => "actions repeated too quickly",
            PatternKind::ExactRepetition => "identical action repeated",
            PatternKind::HighFrequency => "too many actions in a short period",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a heuristic match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub kind: PatternKind,
    /// Severity weight; the limiter escalates to a block above a threshold.
    pub score: u32,
    /// Records counted in the frequency window (high frequency only).
    pub count: Option<usize>,
}

/// A recorded detection, consumed by the admin monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspicionEvent {
    pub user_id: UserId,
    pub action_type: ActionType,
    pub kind: PatternKind,
    pub score: u32,
    pub at: Instant,
    pub count: Option<usize>,
}

pub struct SuspicionDetector {
    config: DetectorConfig,
    events: Mutex<VecDeque<SuspicionEvent>>,
}

impl SuspicionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config, events: Mutex::new(VecDeque::new()) }
    }

    /// Classify `history` (oldest first, newest last) without recording anything.
    pub fn classify(
        &self,
        action: &ActionType,
        history: &VecDeque<ActionRecord>,
    ) -> Option<Detection> {
        self.too_fast(history)
            .or_else(|| self.exact_repetition(history))
            .or_else(|| self.high_frequency(action, history))
    }

    /// Classify `history` and keep a [`SuspicionEvent`] when it matches.
    pub fn evaluate(
        &self,
        user: &UserId,
        action: &ActionType,
        history: &VecDeque<ActionRecord>,
    ) -> Option<Detection> {
        let detection = self.classify(action, history)?;

        tracing::debug!(
            user = %user,
            action = %action,
            pattern = %detection.kind,
            score = detection.score,
            "suspicious activity detected"
        );

        self.push_event(SuspicionEvent {
            user_id: user.clone(),
            action_type: action.clone(),
            kind: detection.kind,
            score: detection.score,
            at: Instant::now(),
            count: detection.count,
        });

        Some(detection)
    }

    /// Events recorded within the trailing `window`, oldest first.
    pub fn events_within(&self, window: Duration) -> Vec<SuspicionEvent> {
        let now = Instant::now();
        let events = lock(&self.events, "suspicion events");
        events
            .iter()
            .filter(|event| now.saturating_duration_since(event.at) <= window)
            .cloned()
            .collect()
    }

    /// Number of retained events.
    pub fn event_count(&self) -> usize {
        lock(&self.events, "suspicion events").len()
    }

    fn too_fast(&self, history: &VecDeque<ActionRecord>) -> Option<Detection> {
        let n = self.config.too_fast_actions;
        if n == 0 || history.len() < n {
            return None;
        }
        let oldest = history.get(history.len() - n)?;
        let newest = history.back()?;
        let span = newest.at.saturating_duration_since(oldest.at);

        (span < self.config.too_fast_window()).then_some(Detection {
            kind: PatternKind::TooFast,
            score: self.config.too_fast_score,
            count: None,
        })
    }

    fn exact_repetition(&self, history: &VecDeque<ActionRecord>) -> Option<Detection> {
        let n = self.config.repetition_actions;
        if n == 0 || history.len() < n {
            return None;
        }
        let mut tail = history.range(history.len() - n..);
        let first = tail.next()?;

        tail.all(|record| record.payload == first.payload).then_some(Detection {
            kind: PatternKind::ExactRepetition,
            score: self.config.repetition_score,
            count: None,
        })
    }

    fn high_frequency(
        &self,
        action: &ActionType,
        history: &VecDeque<ActionRecord>,
    ) -> Option<Detection> {
        let now = Instant::now();
        let window = self.config.frequency_window();
        let count = history
            .iter()
            .filter(|record| now.saturating_duration_since(record.at) < window)
            .count();

        let ceiling = self.config.ceiling_for(action);
        if count <= ceiling {
            return None;
        }
        let excess = u32::try_from(count - ceiling).unwrap_or(u32::MAX);

        Some(Detection {
            kind: PatternKind::HighFrequency,
            score: excess.min(self.config.frequency_max_score),
            count: Some(count),
        })
    }

    fn push_event(&self, event: SuspicionEvent) {
        let retention = self.config.event_retention();
        let now = event.at;
        let mut events = lock(&self.events, "suspicion events");

        while events
            .front()
            .is_some_and(|oldest| now.saturating_duration_since(oldest.at) > retention)
        {
            events.pop_front();
        }
        events.push_back(event);
        while events.len() > self.config.max_events {
            events.pop_front();
        }
    }
}
