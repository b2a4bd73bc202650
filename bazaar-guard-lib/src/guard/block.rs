//! Temporary denylist of users with timed expiry.

use ahash::AHashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::action::UserId;
use super::lock;

/// Longest block accepted; longer requests are clamped.
pub const MAX_BLOCK: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Confirmation returned by [`BlockRegistry::block`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockReceipt {
    pub blocked: bool,
    pub user_id: UserId,
    /// Wall-clock expiry as milliseconds since the Unix epoch
    pub until_unix_ms: u64,
    pub duration_secs: u64,
}

/// An active block, as listed for the admin view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSnapshot {
    pub user_id: UserId,
    pub reason: String,
    pub remaining_secs: u64,
    pub until_unix_ms: u64,
}

struct BlockEntry {
    expires_at: Instant,
    until_unix_ms: u64,
    reason: String,
    expiry: Option<JoinHandle<()>>,
}

impl BlockEntry {
    fn cancel_expiry(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

/// Set of temporarily blocked users.
///
/// Every block owns one expiry task on the ambient tokio runtime. Blocking an
/// already blocked user cancels the pending task and schedules a new one, so
/// the latest call decides the expiry. Expired entries are also discarded on
/// read, which keeps the registry correct when no runtime is available.
#[derive(Clone, Default)]
pub struct BlockRegistry {
    entries: Arc<Mutex<AHashMap<UserId, BlockEntry>>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `user` for `duration` (at most [`MAX_BLOCK`]), replacing any existing block.
    pub fn block(
        &self,
        user: &UserId,
        duration: Duration,
        reason: impl Into<String>,
    ) -> BlockReceipt {
        let reason = reason.into();
        let duration = duration.min(MAX_BLOCK);
        let expires_at = Instant::now() + duration;
        let until_unix_ms = unix_ms_after(duration);

        let expiry = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let registry = self.clone();
            let user = user.clone();
            handle.spawn(async move {
                tokio::time::sleep_until(expires_at).await;
                registry.expire(&user, expires_at);
            })
        });

        let mut entries = lock(&self.entries, "block registry");
        if let Some(mut previous) = entries.insert(
            user.clone(),
            BlockEntry { expires_at, until_unix_ms, reason: reason.clone(), expiry },
        ) {
            previous.cancel_expiry();
            tracing::debug!(user = %user, "existing block replaced");
        }
        drop(entries);

        tracing::info!(
            user = %user,
            reason = %reason,
            duration_secs = duration.as_secs(),
            "user blocked"
        );

        BlockReceipt {
            blocked: true,
            user_id: user.clone(),
            until_unix_ms,
            duration_secs: duration.as_secs(),
        }
    }

    pub fn is_blocked(&self, user: &UserId) -> bool {
        self.remaining(user).is_some()
    }

    /// Time left on the block of `user`, `None` when not blocked.
    pub fn remaining(&self, user: &UserId) -> Option<Duration> {
        let now = Instant::now();
        let mut entries = lock(&self.entries, "block registry");
        let expires_at = entries.get(user)?.expires_at;
        if expires_at <= now {
            if let Some(mut entry) = entries.remove(user) {
                entry.cancel_expiry();
            }
            return None;
        }
        Some(expires_at.saturating_duration_since(now))
    }

    /// Lift the block of `user`. Returns whether a block was active.
    pub fn unblock(&self, user: &UserId) -> bool {
        let removed = lock(&self.entries, "block registry").remove(user);
        match removed {
            Some(mut entry) => {
                entry.cancel_expiry();
                let active = entry.expires_at > Instant::now();
                if active {
                    tracing::info!(user = %user, "user unblocked");
                }
                active
            }
            None => false,
        }
    }

    /// Active blocks ordered by user id.
    pub fn active(&self) -> Vec<BlockSnapshot> {
        let now = Instant::now();
        let mut entries = lock(&self.entries, "block registry");
        entries.retain(|_, entry| {
            let keep = entry.expires_at > now;
            if !keep {
                entry.cancel_expiry();
            }
            keep
        });

        let mut snapshots: Vec<_> = entries
            .iter()
            .map(|(user, entry)| BlockSnapshot {
                user_id: user.clone(),
                reason: entry.reason.clone(),
                remaining_secs: entry.expires_at.saturating_duration_since(now).as_secs(),
                until_unix_ms: entry.until_unix_ms,
            })
            .collect();
        snapshots.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        snapshots
    }

    /// Number of entries, including expired ones not yet collected.
    pub fn len(&self) -> usize {
        lock(&self.entries, "block registry").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Runs from the expiry task; a newer block for the same user carries a
    // different deadline and is left alone.
    fn expire(&self, user: &UserId, expires_at: Instant) {
        let mut entries = lock(&self.entries, "block registry");
        if entries.get(user).is_some_and(|entry| entry.expires_at == expires_at) {
            entries.remove(user);
            tracing::info!(user = %user, "block expired");
        }
    }
}

fn unix_ms_after(duration: Duration) -> u64 {
    SystemTime::now()
        .checked_add(duration)
        .and_then(|until| until.duration_since(UNIX_EPOCH).ok())
        .map(|since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
