use hyper::Response;
use hyper::StatusCode;
use serde_json::json;

use crate::api::response::{json_response, RespBody};
use crate::error::Result;
use crate::guard::Guard;

/// Health check response - always returns 200 if process is running
pub fn health_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "healthy"}))
}

/// Readiness check - reports the size of the in-memory state
pub fn ready_check_response(guard: &Guard) -> Result<Response<RespBody>> {
    json_response(
        StatusCode::OK,
        &json!({
            "status": "ready",
            "tracked_entries": guard.action_log().len(),
            "suspicion_events": guard.detector().event_count(),
            "active_blocks": guard.active_blocks().len(),
        }),
    )
}

/// Liveness check - always returns 200 if process is running
pub fn live_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "alive"}))
}
