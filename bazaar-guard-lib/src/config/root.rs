use serde::Deserialize;
use std::net::SocketAddr;

use super::guard::{ActionLogConfig, DetectorConfig, LimiterConfig, MonitorConfig};
use super::remote::RemoteQuotaConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port the guard API listens on
    /// Example: "0.0.0.0:8080" or "127.0.0.1:9000"
    /// Default: "127.0.0.1:8080"
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Maximum accepted request body size in bytes
    /// Default: 65536 (64 KiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Graceful shutdown timeout in seconds
    /// Default: 10
    #[serde(default = "default_shutdown_secs")]
    pub shutdown_secs: u64,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry configuration
    /// Controls metrics and the observability server
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Per-(user, action) history buffers
    #[serde(default)]
    pub action_log: ActionLogConfig,
    /// Suspicion heuristics thresholds
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Verdict escalation policy
    #[serde(default)]
    pub limiter: LimiterConfig,
    /// Admin monitor aggregation
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Remote quota service (optional)
    /// If not provided, `limit`/`window` options are answered locally
    /// Default: None
    #[serde(default)]
    pub remote: Option<RemoteQuotaConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_secs: default_shutdown_secs(),
            logging: LoggingConfig::default(),
            telemetry: TelemetryConfig::default(),
            action_log: ActionLogConfig::default(),
            detector: DetectorConfig::default(),
            limiter: LimiterConfig::default(),
            monitor: MonitorConfig::default(),
            remote: None,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_shutdown_secs() -> u64 {
    10
}
