//! Shared test helpers for guard tests

#![allow(dead_code)]

use bazaar_guard_lib::config::Config;
use bazaar_guard_lib::guard::{CheckOptions, Guard, Payload, UserId};
use serde_json::json;

pub type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap_or_else(|e| panic!("invalid user id {id:?}: {e}"))
}

/// `{"query": q}`
pub fn query(q: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert("query".to_string(), json!(q));
    payload
}

/// Distinct payload per index, so exact repetition never matches.
pub fn nth_query(n: usize) -> CheckOptions {
    CheckOptions::with_payload(query(&format!("item-{n}")))
}

pub fn guard() -> Guard {
    Guard::new(&Config::default())
}

pub fn guard_with(configure: impl FnOnce(&mut Config)) -> Guard {
    let mut config = Config::default();
    configure(&mut config);
    Guard::new(&config)
}
