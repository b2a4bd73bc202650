use serde::Deserialize;
use std::time::Duration;

/// Remote quota service configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RemoteQuotaConfig {
    /// Endpoint receiving the quota check as a JSON POST
    /// Example: "https://db.example.com/rpc/check_rate_limit"
    pub url: String,
    /// Bearer token sent in the Authorization header (optional)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    /// Default: 2000
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Allow the action when the quota service fails or is unreachable
    /// When false the action is denied instead
    /// Default: true
    #[serde(default = "default_fail_open")]
    pub fail_open: bool,
}

impl RemoteQuotaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_fail_open() -> bool {
    true
}
