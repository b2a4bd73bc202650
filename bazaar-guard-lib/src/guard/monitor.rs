//! Admin monitor: aggregation of suspicion events and manual block control.

use ahash::AHashMap;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use super::action::UserId;
use super::block::{BlockReceipt, BlockSnapshot};
use super::detector::{PatternKind, SuspicionEvent};
use super::limiter::Guard;
use crate::telemetry::metrics::values;

/// A user with enough recent suspicion events to be reviewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspiciousUser {
    pub user_id: UserId,
    /// Number of suspicion events in the window
    pub score: usize,
    /// Distinct patterns, in the order first seen
    pub patterns: Vec<PatternKind>,
    pub is_blocked: bool,
    pub last_seen_secs_ago: u64,
}

/// Group `events` by user and keep users with at least `min_events` of them.
///
/// Results are ordered by score (descending), then user id.
pub fn aggregate(
    events: &[SuspicionEvent],
    min_events: usize,
    now: Instant,
    is_blocked: impl Fn(&UserId) -> bool,
) -> Vec<SuspiciousUser> {
    let mut per_user: AHashMap<&UserId, (usize, Vec<PatternKind>, Instant)> = AHashMap::new();
    for event in events {
        let (count, patterns, last_seen) =
            per_user.entry(&event.user_id).or_insert_with(|| (0, Vec::new(), event.at));
        *count += 1;
        if !patterns.contains(&event.kind) {
            patterns.push(event.kind);
        }
        if event.at > *last_seen {
            *last_seen = event.at;
        }
    }

    let mut users: Vec<_> = per_user
        .into_iter()
        .filter(|(_, (count, _, _))| *count >= min_events)
        .map(|(user, (count, patterns, last_seen))| SuspiciousUser {
            user_id: user.clone(),
            score: count,
            patterns,
            is_blocked: is_blocked(user),
            last_seen_secs_ago: now.saturating_duration_since(last_seen).as_secs(),
        })
        .collect();

    users.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.user_id.cmp(&b.user_id)));
    users
}

impl Guard {
    /// Users with at least `monitor.min_events` suspicion events in the trailing `window`.
    pub fn suspicious_users(&self, window: Duration) -> Vec<SuspiciousUser> {
        let events = self.detector.events_within(window);
        aggregate(&events, self.monitor.min_events, Instant::now(), |user| {
            self.blocks.is_blocked(user)
        })
    }

    /// Window used by the admin view when none is requested.
    pub fn default_monitor_window(&self) -> Duration {
        Duration::from_secs(self.monitor.default_window_minutes.saturating_mul(60))
    }

    /// Manually block `user` for `minutes`.
    pub fn block_user(&self, user: &UserId, minutes: u64) -> BlockReceipt {
        let receipt =
            self.blocks.block(user, Duration::from_secs(minutes.saturating_mul(60)), "manual");
        if let Some(m) = &self.metrics {
            m.record_block(values::ORIGIN_MANUAL);
        }
        receipt
    }

    /// Lift the block of `user`. Returns whether a block was active.
    pub fn unblock_user(&self, user: &UserId) -> bool {
        let lifted = self.blocks.unblock(user);
        if lifted {
            if let Some(m) = &self.metrics {
                m.record_unblock();
            }
        } else {
            info!(user = %user, "unblock requested for a user that is not blocked");
        }
        lifted
    }

    pub fn active_blocks(&self) -> Vec<BlockSnapshot> {
        self.blocks.active()
    }
}
