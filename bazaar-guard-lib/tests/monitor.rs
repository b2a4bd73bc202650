mod helpers;

use bazaar_guard_lib::guard::{ActionType, CheckOptions, Guard, PatternKind, UserId};
use helpers::{guard, guard_with, user};
use std::time::Duration;
use tokio::time::advance;

const HOUR: Duration = Duration::from_secs(3600);

/// Fire `n` actions at the same instant. From the third on each one is too fast.
async fn burst(guard: &Guard, user: &UserId, n: usize) {
    for _ in 0..n {
        guard.check_and_update(user, &ActionType::Contact, CheckOptions::default()).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_events_list_user_two_do_not() {
    let guard = guard();
    let alice = user("alice");
    let bob = user("bob");

    burst(&guard, &alice, 4).await; // 2 events
    burst(&guard, &bob, 5).await; // 3 events

    let users = guard.suspicious_users(HOUR);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id, bob);
    assert_eq!(users[0].score, 3);
    assert_eq!(users[0].patterns, vec![PatternKind::TooFast]);
    assert!(!users[0].is_blocked);
    assert_eq!(users[0].last_seen_secs_ago, 0);
}

#[tokio::test(start_paused = true)]
async fn test_users_ordered_by_score() {
    let guard = guard();
    burst(&guard, &user("carol"), 5).await;
    burst(&guard, &user("dave"), 8).await;
    burst(&guard, &user("erin"), 5).await;

    let ids: Vec<_> =
        guard.suspicious_users(HOUR).into_iter().map(|u| u.user_id.to_string()).collect();
    assert_eq!(ids, ["dave", "carol", "erin"]);
}

#[tokio::test(start_paused = true)]
async fn test_old_events_fall_out_of_window() {
    let guard = guard();
    burst(&guard, &user("alice"), 5).await;

    advance(Duration::from_secs(10 * 60)).await;
    let users = guard.suspicious_users(HOUR);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].last_seen_secs_ago, 600);

    advance(HOUR).await;
    assert!(guard.suspicious_users(HOUR).is_empty());
    assert_eq!(guard.suspicious_users(2 * HOUR).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_block_status_is_reported() {
    let guard = guard();
    let alice = user("alice");
    burst(&guard, &alice, 5).await;
    guard.block_user(&alice, 10);

    let users = guard.suspicious_users(HOUR);
    assert!(users[0].is_blocked);

    guard.unblock_user(&alice);
    assert!(!guard.suspicious_users(HOUR)[0].is_blocked);
}

#[tokio::test(start_paused = true)]
async fn test_min_events_is_configurable() {
    let guard = guard_with(|c| c.monitor.min_events = 1);
    burst(&guard, &user("alice"), 3).await;

    assert_eq!(guard.suspicious_users(HOUR).len(), 1);
    assert_eq!(guard.default_monitor_window(), HOUR);
}

#[tokio::test(start_paused = true)]
async fn test_active_blocks_lists_manual_blocks() {
    let guard = guard();
    let receipt = guard.block_user(&user("alice"), 2);
    assert!(receipt.blocked);
    assert_eq!(receipt.duration_secs, 120);

    let blocks = guard.active_blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].reason, "manual");
    assert_eq!(blocks[0].remaining_secs, 120);
}
