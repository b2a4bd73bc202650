use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

pub mod labels {
    pub const ACTION_TYPE: &str = "action_type";
    pub const OUTCOME: &str = "outcome";
    pub const PATTERN: &str = "pattern";
    pub const ORIGIN: &str = "origin";
    pub const RESULT: &str = "result";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const ORIGIN_AUTO: &str = "auto";
    pub const ORIGIN_MANUAL: &str = "manual";
    pub const REMOTE_ALLOWED: &str = "allowed";
    pub const REMOTE_DENIED: &str = "denied";
    pub const REMOTE_ERROR: &str = "error";
}

#[derive(Clone)]
pub struct Metrics {
    pub checks_total: Counter<u64>,
    pub check_duration_seconds: Histogram<f64>,
    pub verdicts_total: Counter<u64>,

    pub suspicion_flags_total: Counter<u64>,

    pub blocks_total: Counter<u64>,
    pub unblocks_total: Counter<u64>,

    pub remote_checks_total: Counter<u64>,
    pub remote_check_duration_seconds: Histogram<f64>,

    pub action_log_pruned_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            checks_total: meter
                .u64_counter("bazaar_guard_checks_total")
                .with_description("Total number of action checks evaluated")
                .build(),
            check_duration_seconds: meter
                .f64_histogram("bazaar_guard_check_duration_seconds")
                .with_description("Action check duration in seconds, remote quota included")
                .build(),
            verdicts_total: meter
                .u64_counter("bazaar_guard_verdicts_total")
                .with_description("Total number of verdicts by outcome")
                .build(),

            suspicion_flags_total: meter
                .u64_counter("bazaar_guard_suspicion_flags_total")
                .with_description("Total number of suspicious patterns detected")
                .build(),

            blocks_total: meter
                .u64_counter("bazaar_guard_blocks_total")
                .with_description("Total number of blocks placed. origin=auto|manual")
                .build(),
            unblocks_total: meter
                .u64_counter("bazaar_guard_unblocks_total")
                .with_description("Total number of blocks lifted by an admin")
                .build(),

            remote_checks_total: meter
                .u64_counter("bazaar_guard_remote_checks_total")
                .with_description("Total remote quota checks. result=allowed|denied|error")
                .build(),
            remote_check_duration_seconds: meter
                .f64_histogram("bazaar_guard_remote_check_duration_seconds")
                .with_description("Remote quota check duration in seconds")
                .build(),

            action_log_pruned_total: meter
                .u64_counter("bazaar_guard_action_log_pruned_total")
                .with_description("Total number of idle action log entries dropped")
                .build(),

            build_info: meter
                .u64_gauge("bazaar_guard_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_check(&self, action_type: &'static str) {
        self.checks_total.add(1, &[KeyValue::new(labels::ACTION_TYPE, action_type)]);
    }

    pub fn record_verdict(&self, action_type: &'static str, outcome: &'static str, seconds: f64) {
        self.verdicts_total.add(
            1,
            &[
                KeyValue::new(labels::ACTION_TYPE, action_type),
                KeyValue::new(labels::OUTCOME, outcome),
            ],
        );
        self.check_duration_seconds
            .record(seconds, &[KeyValue::new(labels::OUTCOME, outcome)]);
    }

    pub fn record_suspicion(&self, action_type: &'static str, pattern: &'static str) {
        self.suspicion_flags_total.add(
            1,
            &[
                KeyValue::new(labels::ACTION_TYPE, action_type),
                KeyValue::new(labels::PATTERN, pattern),
            ],
        );
    }

    pub fn record_block(&self, origin: &'static str) {
        self.blocks_total.add(1, &[KeyValue::new(labels::ORIGIN, origin)]);
    }

    pub fn record_unblock(&self) {
        self.unblocks_total.add(1, &[]);
    }

    pub fn record_remote_check(&self, result: &'static str, seconds: f64) {
        self.remote_checks_total
            .add(1, &[KeyValue::new(labels::RESULT, result)]);
        self.remote_check_duration_seconds
            .record(seconds, &[KeyValue::new(labels::RESULT, result)]);
    }

    pub fn record_pruned(&self, entries: usize) {
        if entries > 0 {
            self.action_log_pruned_total
                .add(u64::try_from(entries).unwrap_or(u64::MAX), &[]);
        }
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("bazaar-guard");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
