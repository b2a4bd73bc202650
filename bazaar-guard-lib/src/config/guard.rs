use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::guard::ActionType;

/// Action log configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ActionLogConfig {
    /// Maximum records kept per (user, action type)
    /// Oldest records are evicted first
    /// Default: 100
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Entries whose newest record is older than this are dropped by the sweeper
    /// Default: 3600 (1 hour)
    #[serde(default = "default_idle_retention_secs")]
    pub idle_retention_secs: u64,
    /// How often the sweeper runs
    /// Default: 60
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            idle_retention_secs: default_idle_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl ActionLogConfig {
    pub fn idle_retention(&self) -> Duration {
        Duration::from_secs(self.idle_retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Suspicion heuristics configuration
///
/// Heuristics run in a fixed order (too fast, exact repetition, high
/// frequency) and the first match wins.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Number of trailing actions inspected by the too-fast heuristic
    /// Default: 3
    #[serde(default = "default_too_fast_actions")]
    pub too_fast_actions: usize,
    /// The trailing actions are too fast when they span less than this
    /// Default: 1000
    #[serde(default = "default_too_fast_window_ms")]
    pub too_fast_window_ms: u64,
    /// Default: 3
    #[serde(default = "default_too_fast_score")]
    pub too_fast_score: u32,
    /// Number of trailing actions that must carry identical payloads
    /// Default: 5
    #[serde(default = "default_repetition_actions")]
    pub repetition_actions: usize,
    /// Default: 5
    #[serde(default = "default_repetition_score")]
    pub repetition_score: u32,
    /// Trailing window of the high-frequency heuristic
    /// Default: 60
    #[serde(default = "default_frequency_window_secs")]
    pub frequency_window_secs: u64,
    /// Upper bound of the high-frequency score
    /// Default: 10
    #[serde(default = "default_frequency_max_score")]
    pub frequency_max_score: u32,
    /// Ceiling used for action types without a built-in or configured one
    /// Default: 10
    #[serde(default = "default_ceiling")]
    pub default_ceiling: usize,
    /// Per-action-type ceilings, overriding the built-in ones
    /// Built-in: SEARCH = 30, CONTACT = 10, SAVE = 20, PRODUCT_CREATE = 5
    /// Example: { SEARCH = 50, REPORT = 3 }
    #[serde(default)]
    pub ceilings: HashMap<ActionType, usize>,
    /// Maximum suspicion events retained for the admin monitor
    /// Default: 10000
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Suspicion events older than this are discarded
    /// Default: 86400 (24 hours)
    #[serde(default = "default_event_retention_secs")]
    pub event_retention_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            too_fast_actions: default_too_fast_actions(),
            too_fast_window_ms: default_too_fast_window_ms(),
            too_fast_score: default_too_fast_score(),
            repetition_actions: default_repetition_actions(),
            repetition_score: default_repetition_score(),
            frequency_window_secs: default_frequency_window_secs(),
            frequency_max_score: default_frequency_max_score(),
            default_ceiling: default_ceiling(),
            ceilings: HashMap::new(),
            max_events: default_max_events(),
            event_retention_secs: default_event_retention_secs(),
        }
    }
}

impl DetectorConfig {
    /// Maximum number of actions of `action` allowed inside the frequency window.
    pub fn ceiling_for(&self, action: &ActionType) -> usize {
        if let Some(ceiling) = self.ceilings.get(action) {
            return *ceiling;
        }
        match action {
            ActionType::Search => 30,
            ActionType::Contact => 10,
            ActionType::Save => 20,
            ActionType::ProductCreate => 5,
            ActionType::Other(_) => self.default_ceiling,
        }
    }

    pub fn too_fast_window(&self) -> Duration {
        Duration::from_millis(self.too_fast_window_ms)
    }

    pub fn frequency_window(&self) -> Duration {
        Duration::from_secs(self.frequency_window_secs)
    }

    pub fn event_retention(&self) -> Duration {
        Duration::from_secs(self.event_retention_secs)
    }
}

/// Verdict escalation configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LimiterConfig {
    /// Suspicion scores strictly above this trigger an automatic block
    /// Default: 5
    #[serde(default = "default_auto_block_score")]
    pub auto_block_score: u32,
    /// Duration of an automatic block in minutes
    /// Default: 30
    #[serde(default = "default_auto_block_minutes")]
    pub auto_block_minutes: u64,
    /// Remaining/total reported on allowed verdicts when the caller gives no limit
    /// Default: 10
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Allow suspicious-but-not-blocking actions and attach a warning
    /// When false (default) such actions are denied with the warning flag set
    #[serde(default)]
    pub soft_warnings: bool,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            auto_block_score: default_auto_block_score(),
            auto_block_minutes: default_auto_block_minutes(),
            default_limit: default_limit(),
            soft_warnings: false,
        }
    }
}

impl LimiterConfig {
    pub fn auto_block_duration(&self) -> Duration {
        Duration::from_secs(self.auto_block_minutes.saturating_mul(60))
    }
}

/// Admin monitor configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Minimum suspicion events in the window for a user to be reported
    /// Default: 3
    #[serde(default = "default_min_events")]
    pub min_events: usize,
    /// Window used when the admin query does not specify one, in minutes
    /// Default: 60
    #[serde(default = "default_window_minutes")]
    pub default_window_minutes: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { min_events: default_min_events(), default_window_minutes: default_window_minutes() }
    }
}

fn default_capacity() -> usize {
    100
}

fn default_idle_retention_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_too_fast_actions() -> usize {
    3
}

fn default_too_fast_window_ms() -> u64 {
    1000
}

fn default_too_fast_score() -> u32 {
    3
}

fn default_repetition_actions() -> usize {
    5
}

fn default_repetition_score() -> u32 {
    5
}

fn default_frequency_window_secs() -> u64 {
    60
}

fn default_frequency_max_score() -> u32 {
    10
}

fn default_ceiling() -> usize {
    10
}

fn default_max_events() -> usize {
    10_000
}

fn default_event_retention_secs() -> u64 {
    86_400 // 24 hours
}

fn default_auto_block_score() -> u32 {
    5
}

fn default_auto_block_minutes() -> u64 {
    30
}

fn default_limit() -> u32 {
    10
}

fn default_min_events() -> usize {
    3
}

fn default_window_minutes() -> u64 {
    60
}
