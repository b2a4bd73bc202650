//! Single entry point combining block status, suspicion heuristics and the
//! optional remote quota check into one [`Verdict`] per action attempt.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::action::{ActionType, Payload, UserId};
use super::action_log::ActionLog;
use super::block::BlockRegistry;
use super::detector::{Detection, SuspicionDetector};
use super::verdict::Verdict;
use crate::config::{Config, LimiterConfig, MonitorConfig};
use crate::error::Result;
use crate::quota::{HttpQuotaClient, QuotaCheck};
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Per-call options of [`Guard::check_and_update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckOptions {
    /// Quota size; also reported as `remaining`/`total` on local allows.
    pub limit: Option<u32>,
    /// Quota window in minutes. The remote check only runs when both
    /// `limit` and `window_minutes` are set.
    pub window_minutes: Option<u64>,
    pub payload: Option<Payload>,
}

impl CheckOptions {
    pub fn with_payload(payload: Payload) -> Self {
        Self { payload: Some(payload), ..Self::default() }
    }

    pub fn with_quota(limit: u32, window_minutes: u64) -> Self {
        Self { limit: Some(limit), window_minutes: Some(window_minutes), payload: None }
    }
}

enum LocalOutcome {
    Decided(Verdict),
    Proceed(Option<Detection>),
}

/// Behavior guard shared by every caller of the process.
///
/// Construct it once at start-up and share it behind an `Arc`.
pub struct Guard {
    pub(super) log: ActionLog,
    pub(super) detector: SuspicionDetector,
    pub(super) blocks: BlockRegistry,
    pub(super) limiter: LimiterConfig,
    pub(super) monitor: MonitorConfig,
    quota: Option<Arc<dyn QuotaCheck>>,
    fail_open: bool,
    pub(super) metrics: Option<Arc<Metrics>>,
}

impl Guard {
    /// Build a guard without a remote quota client.
    pub fn new(config: &Config) -> Self {
        Self {
            log: ActionLog::new(config.action_log.capacity),
            detector: SuspicionDetector::new(config.detector.clone()),
            blocks: BlockRegistry::new(),
            limiter: config.limiter.clone(),
            monitor: config.monitor.clone(),
            quota: None,
            fail_open: true,
            metrics: None,
        }
    }

    /// Build a guard, wiring the HTTP quota client when `[remote]` is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let guard = Self::new(config);
        match &config.remote {
            Some(remote) => {
                let client = HttpQuotaClient::new(remote)?;
                info!(
                    url = client.url(),
                    fail_open = remote.fail_open,
                    "remote quota check enabled"
                );
                Ok(guard.with_quota_check(Arc::new(client), remote.fail_open))
            }
            None => Ok(guard),
        }
    }

    pub fn with_quota_check(mut self, quota: Arc<dyn QuotaCheck>, fail_open: bool) -> Self {
        self.quota = Some(quota);
        self.fail_open = fail_open;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.log
    }

    pub fn detector(&self) -> &SuspicionDetector {
        &self.detector
    }

    pub fn blocks(&self) -> &BlockRegistry {
        &self.blocks
    }

    /// Decide whether `user` may perform `action` now, recording the attempt.
    ///
    /// Never fails: remote quota errors are resolved by the fail-open policy.
    pub async fn check_and_update(
        &self,
        user: &UserId,
        action: &ActionType,
        options: CheckOptions,
    ) -> Verdict {
        let started = Instant::now();
        if let Some(m) = &self.metrics {
            m.record_check(action.metric_label());
        }

        let CheckOptions { limit, window_minutes, payload } = options;

        let verdict = match self.check_local(user, action, payload.unwrap_or_default()) {
            LocalOutcome::Decided(verdict) => verdict,
            LocalOutcome::Proceed(warning) => {
                let verdict = match (limit, window_minutes) {
                    (Some(limit), Some(window)) => {
                        self.check_remote(user, action, limit, window).await
                    }
                    _ => None,
                };
                let verdict = verdict
                    .unwrap_or_else(|| Verdict::allow(limit.unwrap_or(self.limiter.default_limit)));
                match warning {
                    Some(detection) if verdict.allowed => verdict.with_warning(&detection),
                    _ => verdict,
                }
            }
        };

        debug!(
            user = %user,
            action = %action,
            outcome = verdict.outcome(),
            "action checked"
        );
        if let Some(m) = &self.metrics {
            let seconds = started.elapsed().as_secs_f64();
            m.record_verdict(action.metric_label(), verdict.outcome(), seconds);
        }

        verdict
    }

    // Steps that never suspend: block status, recording, heuristics, escalation.
    fn check_local(&self, user: &UserId, action: &ActionType, payload: Payload) -> LocalOutcome {
        if let Some(remaining) = self.blocks.remaining(user) {
            return LocalOutcome::Decided(Verdict::blocked(remaining));
        }

        let detection = self.log.record_then(user, action, payload, |history| {
            self.detector.evaluate(user, action, history)
        });

        let Some(detection) = detection else {
            return LocalOutcome::Proceed(None);
        };

        if let Some(m) = &self.metrics {
            m.record_suspicion(action.metric_label(), detection.kind.as_str());
        }

        if detection.score > self.limiter.auto_block_score {
            let duration = self.limiter.auto_block_duration();
            self.blocks.block(user, duration, detection.kind.as_str());
            if let Some(m) = &self.metrics {
                m.record_block(values::ORIGIN_AUTO);
            }
            warn!(
                user = %user,
                action = %action,
                pattern = %detection.kind,
                score = detection.score,
                minutes = self.limiter.auto_block_minutes,
                "suspicious activity, user automatically blocked"
            );
            return LocalOutcome::Decided(Verdict::auto_blocked(&detection, duration));
        }

        if self.limiter.soft_warnings {
            LocalOutcome::Proceed(Some(detection))
        } else {
            LocalOutcome::Decided(Verdict::warning(&detection))
        }
    }

    // `None` means the remote check does not object; the local allow applies.
    async fn check_remote(
        &self,
        user: &UserId,
        action: &ActionType,
        limit: u32,
        window_minutes: u64,
    ) -> Option<Verdict> {
        let quota = self.quota.as_ref()?;
        let started = Instant::now();
        let result = quota.check_rate_limit(user, action, limit, window_minutes).await;
        let seconds = started.elapsed().as_secs_f64();

        match result {
            Ok(decision) if decision.allowed => {
                if let Some(m) = &self.metrics {
                    m.record_remote_check(values::REMOTE_ALLOWED, seconds);
                }
                debug!(
                    user = %user,
                    action = %action,
                    remaining = decision.remaining,
                    "remote quota allows"
                );
                None
            }
            Ok(decision) => {
                if let Some(m) = &self.metrics {
                    m.record_remote_check(values::REMOTE_DENIED, seconds);
                }
                debug!(
                    user = %user,
                    action = %action,
                    remaining = decision.remaining,
                    total = decision.total,
                    "remote quota exceeded"
                );
                Some(Verdict::quota_denied(&decision))
            }
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.record_remote_check(values::REMOTE_ERROR, seconds);
                }
                if self.fail_open {
                    warn!(
                        user = %user,
                        action = %action,
                        error = %e,
                        "remote quota check failed, allowing"
                    );
                    None
                } else {
                    warn!(
                        user = %user,
                        action = %action,
                        error = %e,
                        "remote quota check failed, denying"
                    );
                    Some(Verdict::quota_unavailable())
                }
            }
        }
    }

    /// Drop action log entries idle for longer than `max_idle`.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let pruned = self.log.prune_idle(max_idle);
        if let Some(m) = &self.metrics {
            m.record_pruned(pruned);
        }
        if pruned > 0 {
            debug!(entries = pruned, "pruned idle action log entries");
        }
        pruned
    }
}
