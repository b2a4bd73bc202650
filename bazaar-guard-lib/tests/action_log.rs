mod helpers;

use bazaar_guard_lib::guard::{ActionLog, ActionType};
use helpers::{query, user};
use serde_json::json;
use std::time::Duration;

#[test]
fn test_buffer_keeps_newest_hundred_records() {
    let log = ActionLog::new(100);
    let alice = user("alice");

    for n in 0..150 {
        log.record(&alice, &ActionType::Search, query(&n.to_string()));
    }

    let history = log.history(&alice, &ActionType::Search);
    assert_eq!(history.len(), 100);
    assert_eq!(history.first().and_then(|r| r.payload.get("query")), Some(&json!("50")));
    assert_eq!(history.last().and_then(|r| r.payload.get("query")), Some(&json!("149")));
}

#[test]
fn test_buffers_are_per_user_and_action_type() {
    let log = ActionLog::new(100);
    let alice = user("alice");
    let bob = user("bob");

    log.record(&alice, &ActionType::Search, query("a"));
    log.record(&alice, &ActionType::Contact, query("b"));
    log.record(&bob, &ActionType::Search, query("c"));
    log.record(&bob, &ActionType::Search, query("d"));

    assert_eq!(log.len(), 3);
    assert_eq!(log.history(&alice, &ActionType::Search).len(), 1);
    assert_eq!(log.history(&alice, &ActionType::Contact).len(), 1);
    assert_eq!(log.history(&bob, &ActionType::Search).len(), 2);
    assert!(log.history(&bob, &ActionType::Save).is_empty());
}

#[test]
fn test_unknown_pair_has_empty_history() {
    let log = ActionLog::new(10);
    assert!(log.is_empty());
    assert!(log.history(&user("nobody"), &ActionType::Search).is_empty());
}

#[test]
fn test_record_then_sees_new_record_last() {
    let log = ActionLog::new(3);
    let alice = user("alice");
    for q in ["a", "b", "c"] {
        log.record(&alice, &ActionType::Save, query(q));
    }

    let (len, newest) = log.record_then(&alice, &ActionType::Save, query("d"), |history| {
        (history.len(), history.back().and_then(|r| r.payload.get("query").cloned()))
    });

    assert_eq!(len, 3);
    assert_eq!(newest, Some(json!("d")));
}

#[tokio::test(start_paused = true)]
async fn test_prune_idle_drops_quiet_entries_only() {
    let log = ActionLog::new(100);
    log.record(&user("quiet"), &ActionType::Search, query("x"));

    tokio::time::advance(Duration::from_secs(2 * 3600)).await;
    log.record(&user("busy"), &ActionType::Search, query("y"));

    assert_eq!(log.prune_idle(Duration::from_secs(3600)), 1);
    assert_eq!(log.len(), 1);
    assert!(log.history(&user("quiet"), &ActionType::Search).is_empty());
    assert_eq!(log.history(&user("busy"), &ActionType::Search).len(), 1);
}
