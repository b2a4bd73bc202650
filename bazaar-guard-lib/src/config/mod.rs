mod guard;
mod loader;
mod remote;
mod root;
mod telemetry;
mod validator;

pub use guard::{ActionLogConfig, DetectorConfig, LimiterConfig, MonitorConfig};
pub use loader::{load_from_path, load_from_str};
pub use remote::RemoteQuotaConfig;
pub use root::Config;
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use validator::validate;
