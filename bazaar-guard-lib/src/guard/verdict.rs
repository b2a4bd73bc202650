use serde::Serialize;
use std::time::Duration;

use super::detector::{Detection, PatternKind};
use crate::quota::QuotaDecision;

/// Which component produced the figures of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    Local,
    Database,
}

/// Allow/deny decision for one action attempt.
///
/// A denial is a normal value: the caller shows `reason` and aborts the action.
/// `warning` marks suspicious activity that did not warrant a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub warning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_duration_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_remaining_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_in_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<VerdictSource>,
}

pub const REASON_BLOCKED: &str = "temporarily blocked";
pub const REASON_QUOTA_EXCEEDED: &str = "rate limit exceeded";
pub const REASON_QUOTA_UNAVAILABLE: &str = "quota service unavailable";

impl Verdict {
    fn empty(allowed: bool) -> Self {
        Self {
            allowed,
            reason: None,
            warning: false,
            pattern: None,
            block_duration_minutes: None,
            block_remaining_secs: None,
            remaining: None,
            total: None,
            reset_in_seconds: None,
            source: None,
        }
    }

    pub fn allow(limit: u32) -> Self {
        Self {
            remaining: Some(limit),
            total: Some(limit),
            source: Some(VerdictSource::Local),
            ..Self::empty(true)
        }
    }

    /// Denial for a user already in the block registry.
    pub fn blocked(remaining: Duration) -> Self {
        Self {
            reason: Some(REASON_BLOCKED.to_string()),
            block_duration_minutes: Some(ceil_minutes(remaining)),
            block_remaining_secs: Some(remaining.as_secs()),
            source: Some(VerdictSource::Local),
            ..Self::empty(false)
        }
    }

    /// Denial that just placed the user in the block registry.
    pub fn auto_blocked(detection: &Detection, duration: Duration) -> Self {
        Self {
            reason: Some(detection.kind.description().to_string()),
            pattern: Some(detection.kind),
            block_duration_minutes: Some(ceil_minutes(duration)),
            block_remaining_secs: Some(duration.as_secs()),
            source: Some(VerdictSource::Local),
            ..Self::empty(false)
        }
    }

    /// Suspicious activity below the block threshold.
    pub fn warning(detection: &Detection) -> Self {
        Self {
            reason: Some(detection.kind.description().to_string()),
            warning: true,
            pattern: Some(detection.kind),
            source: Some(VerdictSource::Local),
            ..Self::empty(false)
        }
    }

    pub fn quota_denied(decision: &QuotaDecision) -> Self {
        Self {
            reason: Some(
                decision.message.clone().unwrap_or_else(|| REASON_QUOTA_EXCEEDED.to_string()),
            ),
            remaining: Some(decision.remaining),
            total: Some(decision.total),
            reset_in_seconds: Some(decision.reset_in_seconds),
            source: Some(VerdictSource::Database),
            ..Self::empty(false)
        }
    }

    pub fn quota_unavailable() -> Self {
        Self {
            reason: Some(REASON_QUOTA_UNAVAILABLE.to_string()),
            source: Some(VerdictSource::Database),
            ..Self::empty(false)
        }
    }

    /// Attach a soft warning to an allowed verdict.
    pub fn with_warning(mut self, detection: &Detection) -> Self {
        self.warning = true;
        self.pattern = Some(detection.kind);
        self.reason = Some(detection.kind.description().to_string());
        self
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    /// Label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match (self.allowed, self.warning, self.block_duration_minutes.is_some()) {
            (true, false, _) => "allowed",
            (true, true, _) => "allowed_with_warning",
            (false, _, true) => "blocked",
            (false, true, false) => "warned",
            (false, false, false) => match self.source {
                Some(VerdictSource::Database) => "quota_denied",
                _ => "denied",
            },
        }
    }
}

fn ceil_minutes(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60)
}
