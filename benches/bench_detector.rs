//! Micro benchmarks for the hot path of the guard.
//! Pure CPU: no network, no remote quota service.
//!
//! ```bash
//! cargo bench --bench bench_detector
//! ```

use bazaar_guard_lib::config::{Config, DetectorConfig};
use bazaar_guard_lib::guard::{
    ActionRecord, ActionType, CheckOptions, Guard, Payload, SuspicionDetector, UserId,
};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::json;
use std::collections::VecDeque;
use std::hint::black_box;
use tokio::time::Instant;

fn payload(n: usize) -> Payload {
    let mut payload = Payload::new();
    payload.insert("query".to_string(), json!(format!("item-{n}")));
    payload
}

// ---------------------------------------------------------------------------
// Benchmark 1: classify a full buffer (100 records, no match)
//
// Worst case for the heuristics: every check runs to the end and the
// frequency heuristic scans the whole buffer.
// ---------------------------------------------------------------------------
fn bench_classify_full_buffer(c: &mut Criterion) {
    let detector = SuspicionDetector::new(DetectorConfig {
        too_fast_window_ms: 0,
        ceilings: [(ActionType::Search, 1000)].into_iter().collect(),
        ..DetectorConfig::default()
    });
    let start = Instant::now();
    let history: VecDeque<ActionRecord> = (0..100)
        .map(|n| ActionRecord::new(start, payload(n)))
        .collect();

    c.bench_function("classify_100_records_no_match", |b| {
        b.iter(|| detector.classify(black_box(&ActionType::Search), black_box(&history)))
    });
}

// ---------------------------------------------------------------------------
// Benchmark 2: check_and_update for many distinct users
//
// Measures lock + record + classify + verdict without remote I/O.
// ---------------------------------------------------------------------------
fn bench_check_and_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new()
        .unwrap_or_else(|e| panic!("failed to create tokio runtime: {e}"));
    let guard = Guard::new(&Config::default());
    let users: Vec<UserId> = (0..10_000)
        .map(|n| UserId::new(format!("user-{n}")).unwrap_or_else(|e| panic!("user id: {e}")))
        .collect();

    let mut group = c.benchmark_group("check_and_update");
    group.sample_size(50);

    let mut next = 0usize;
    group.bench_function("distinct_users_search", |b| {
        b.iter_batched(
            || {
                next = (next + 1) % users.len();
                (&users[next], CheckOptions::with_payload(payload(next)))
            },
            |(user, options)| {
                rt.block_on(guard.check_and_update(user, &ActionType::Search, options))
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(guard_benches, bench_classify_full_buffer, bench_check_and_update);
criterion_main!(guard_benches);
