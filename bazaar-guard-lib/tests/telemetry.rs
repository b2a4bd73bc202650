mod helpers;

use bazaar_guard_lib::guard::{ActionType, CheckOptions};
use bazaar_guard_lib::telemetry::{
    health_check_response, live_check_response, metrics_response, ready_check_response, Metrics,
};
use helpers::{guard, user, TestResult};
use http_body_util::BodyExt;
use hyper::StatusCode;
use opentelemetry::metrics::MeterProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

#[tokio::test]
async fn test_probe_endpoints_return_ok() -> TestResult {
    let guard = guard();
    for response in [
        health_check_response()?,
        live_check_response()?,
        ready_check_response(&guard)?,
    ] {
        assert_eq!(response.status(), StatusCode::OK);
    }

    let body = ready_check_response(&guard)?.into_body().collect().await?.to_bytes();
    let ready: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(ready["status"], "ready");
    assert_eq!(ready["active_blocks"], 0);
    Ok(())
}

#[tokio::test]
async fn test_guard_metrics_are_exported() -> TestResult {
    let registry = Registry::new();
    let exporter = opentelemetry_prometheus::exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
    let metrics = Arc::new(Metrics::new(provider.meter("bazaar-guard-test")));

    let guard = guard().with_metrics(metrics);
    let alice = user("alice");
    guard.check_and_update(&alice, &ActionType::Search, CheckOptions::default()).await;
    guard.block_user(&alice, 1);
    guard.unblock_user(&alice);

    let response = metrics_response(&registry)?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await?.to_bytes();
    let text = String::from_utf8(body.to_vec())?;

    assert!(text.contains("bazaar_guard_checks_total"), "missing checks counter:\n{text}");
    assert!(text.contains("bazaar_guard_verdicts_total"), "missing verdicts counter:\n{text}");
    assert!(text.contains("bazaar_guard_blocks_total"), "missing blocks counter:\n{text}");
    assert!(text.contains("bazaar_guard_unblocks_total"), "missing unblocks counter:\n{text}");
    Ok(())
}

#[tokio::test]
async fn test_custom_action_names_share_one_label() -> TestResult {
    let registry = Registry::new();
    let exporter = opentelemetry_prometheus::exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
    let metrics = Arc::new(Metrics::new(provider.meter("bazaar-guard-test")));

    let guard = guard().with_metrics(metrics);
    for name in ["promo_7f1c", "promo_a9d2", "promo_0b44"] {
        let action: ActionType = name.parse()?;
        guard.check_and_update(&user("alice"), &action, CheckOptions::default()).await;
    }

    let body = metrics_response(&registry)?.into_body().collect().await?.to_bytes();
    let text = String::from_utf8(body.to_vec())?;
    assert!(text.contains(r#"action_type="OTHER""#), "missing OTHER label:\n{text}");
    assert!(!text.contains("PROMO_"), "client action name leaked into labels:\n{text}");
    Ok(())
}
