mod helpers;

use bazaar_guard_lib::config::DetectorConfig;
use bazaar_guard_lib::guard::{ActionRecord, ActionType, PatternKind, Payload, SuspicionDetector};
use bazaar_guard_lib::GuardError;
use helpers::{query, user};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{advance, Instant};

/// Build a history by appending `payloads[i]` and then sleeping `gaps_ms[i]`.
/// The clock stops right after the last record.
async fn history(gaps_ms: &[u64], payloads: &[Payload]) -> VecDeque<ActionRecord> {
    let mut records = VecDeque::new();
    for (i, payload) in payloads.iter().enumerate() {
        records.push_back(ActionRecord::new(Instant::now(), payload.clone()));
        if let Some(gap) = gaps_ms.get(i) {
            advance(Duration::from_millis(*gap)).await;
        }
    }
    records
}

fn distinct(n: usize) -> Vec<Payload> {
    (0..n).map(|i| query(&format!("q{i}"))).collect()
}

#[tokio::test(start_paused = true)]
async fn test_three_actions_within_a_second_are_too_fast() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    // t, t+200ms, t+900ms
    let records = history(&[200, 700], &distinct(3)).await;

    let detection = detector.classify(&ActionType::Contact, &records);
    assert_eq!(detection.map(|d| (d.kind, d.score)), Some((PatternKind::TooFast, 3)));
}

#[tokio::test(start_paused = true)]
async fn test_three_actions_over_a_second_are_not_flagged() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    // t, t+600ms, t+1500ms
    let records = history(&[600, 900], &distinct(3)).await;

    assert_eq!(detector.classify(&ActionType::Contact, &records), None);
}

#[tokio::test(start_paused = true)]
async fn test_five_identical_payloads_are_exact_repetition() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    let payloads = vec![query("iphone"); 5];
    let records = history(&[2000; 4], &payloads).await;

    let detection = detector.classify(&ActionType::Search, &records);
    assert_eq!(detection.map(|d| (d.kind, d.score)), Some((PatternKind::ExactRepetition, 5)));
}

#[tokio::test(start_paused = true)]
async fn test_one_different_payload_breaks_repetition() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    let mut payloads = vec![query("iphone"); 5];
    payloads[2] = query("samsung");
    let records = history(&[2000; 4], &payloads).await;

    assert_eq!(detector.classify(&ActionType::Search, &records), None);
}

#[tokio::test(start_paused = true)]
async fn test_thirty_one_searches_in_a_minute_exceed_ceiling() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    let records = history(&[1000; 30], &distinct(31)).await;

    let detection = detector.classify(&ActionType::Search, &records);
    assert_eq!(
        detection.map(|d| (d.kind, d.score, d.count)),
        Some((PatternKind::HighFrequency, 1, Some(31)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_thirty_searches_in_a_minute_are_fine() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    let records = history(&[1000; 29], &distinct(30)).await;

    assert_eq!(detector.classify(&ActionType::Search, &records), None);
}

#[tokio::test(start_paused = true)]
async fn test_frequency_score_is_capped() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    // 30 contacts against a ceiling of 10
    let records = history(&[1500; 29], &distinct(30)).await;

    let detection = detector.classify(&ActionType::Contact, &records);
    assert_eq!(detection.map(|d| (d.kind, d.score)), Some((PatternKind::HighFrequency, 10)));
}

#[tokio::test(start_paused = true)]
async fn test_records_outside_frequency_window_are_ignored() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    let mut records = history(&[1000; 10], &distinct(11)).await;
    advance(Duration::from_secs(61)).await;
    // The eleven old records are out of the window, only these count.
    records.extend(history(&[1000; 4], &distinct(5)).await);

    assert_eq!(detector.classify(&ActionType::ProductCreate, &records), None);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_action_uses_default_ceiling() -> Result<(), GuardError> {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    let review: ActionType = "review".parse()?;
    let records = history(&[2000; 10], &distinct(11)).await;

    let detection = detector.classify(&review, &records);
    assert_eq!(detection.map(|d| (d.kind, d.score)), Some((PatternKind::HighFrequency, 1)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_evaluate_keeps_events_for_the_monitor() {
    let detector = SuspicionDetector::new(DetectorConfig::default());
    let alice = user("alice");
    let records = history(&[100, 100], &distinct(3)).await;

    assert!(detector.evaluate(&alice, &ActionType::Save, &records).is_some());
    assert_eq!(detector.event_count(), 1);

    let events = detector.events_within(Duration::from_secs(60));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, alice);
    assert_eq!(events[0].kind, PatternKind::TooFast);

    advance(Duration::from_secs(120)).await;
    assert!(detector.events_within(Duration::from_secs(60)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_events_expire_after_retention() {
    let config = DetectorConfig { event_retention_secs: 60, ..DetectorConfig::default() };
    let detector = SuspicionDetector::new(config);
    let records = history(&[100, 100], &distinct(3)).await;

    detector.evaluate(&user("alice"), &ActionType::Save, &records);
    advance(Duration::from_secs(61)).await;
    let records = history(&[100, 100], &distinct(3)).await;
    detector.evaluate(&user("bob"), &ActionType::Save, &records);

    assert_eq!(detector.event_count(), 1);
}
