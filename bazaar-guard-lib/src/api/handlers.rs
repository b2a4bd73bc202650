use bytes::Bytes;
use http::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, warn};

use super::response::{error_response, json_response, text_response, RespBody};
use crate::error::{GuardError, Result};
use crate::guard::{ActionType, CheckOptions, Guard, Payload, UserId};

pub const CHECK_PATH: &str = "/v1/check";
pub const SUSPICIOUS_PATH: &str = "/v1/admin/suspicious";
pub const BLOCKS_PATH: &str = "/v1/admin/blocks";

/// Body of `POST /v1/check`
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub user_id: String,
    pub action_type: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub window_minutes: Option<u64>,
    #[serde(default)]
    pub payload: Option<Payload>,
}

/// Body of `POST /v1/admin/blocks`
#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub user_id: String,
    pub minutes: u64,
}

/// Route one request to the guard.
///
/// Transport agnostic: the server hands over the already collected body.
pub async fn dispatch(
    guard: &Guard,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: Bytes,
) -> Response<RespBody> {
    let result = match (method, path) {
        (&Method::POST, CHECK_PATH) => check(guard, &body).await,
        (&Method::GET, SUSPICIOUS_PATH) => suspicious(guard, query),
        (&Method::GET, BLOCKS_PATH) => json_response(StatusCode::OK, &guard.active_blocks()),
        (&Method::POST, BLOCKS_PATH) => block(guard, &body),
        (&Method::DELETE, p) => match blocked_user_segment(p) {
            Some(user) => unblock(guard, user),
            None => return text_response(StatusCode::NOT_FOUND, "Not Found"),
        },
        _ => return text_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    result.unwrap_or_else(|e| {
        if is_client_error(&e) {
            debug!(%method, path, error = %e, "rejecting malformed request");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        } else {
            warn!(%method, path, error = %e, "failed to handle request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    })
}

fn is_client_error(e: &GuardError) -> bool {
    matches!(
        e,
        GuardError::BadRequest(_) | GuardError::MissingUserId | GuardError::InvalidActionType(_)
    )
}

async fn check(guard: &Guard, body: &[u8]) -> Result<Response<RespBody>> {
    let req: CheckRequest = parse_body(body)?;
    let user = UserId::new(req.user_id)?;
    let action: ActionType = req.action_type.parse()?;
    let options =
        CheckOptions { limit: req.limit, window_minutes: req.window_minutes, payload: req.payload };

    let verdict = guard.check_and_update(&user, &action, options).await;
    json_response(StatusCode::OK, &verdict)
}

fn suspicious(guard: &Guard, query: Option<&str>) -> Result<Response<RespBody>> {
    let window = match query_param(query, "window_minutes") {
        Some(raw) => {
            let raw = percent_decode(raw)?;
            let minutes: u64 = raw.parse().map_err(|_| {
                GuardError::BadRequest(format!("window_minutes must be an integer, got {raw:?}"))
            })?;
            if minutes == 0 {
                return Err(GuardError::BadRequest("window_minutes must be > 0".into()));
            }
            Duration::from_secs(minutes.saturating_mul(60))
        }
        None => guard.default_monitor_window(),
    };
    json_response(StatusCode::OK, &guard.suspicious_users(window))
}

fn block(guard: &Guard, body: &[u8]) -> Result<Response<RespBody>> {
    let req: BlockRequest = parse_body(body)?;
    if req.minutes == 0 {
        return Err(GuardError::BadRequest("minutes must be > 0".into()));
    }
    let user = UserId::new(req.user_id)?;
    json_response(StatusCode::OK, &guard.block_user(&user, req.minutes))
}

fn unblock(guard: &Guard, raw_user: &str) -> Result<Response<RespBody>> {
    let user = UserId::new(percent_decode(raw_user)?)?;
    let unblocked = guard.unblock_user(&user);
    json_response(StatusCode::OK, &json!({ "unblocked": unblocked }))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| GuardError::BadRequest(format!("invalid JSON body: {e}")))
}

fn percent_decode(raw: &str) -> Result<Cow<'_, str>> {
    urlencoding::decode(raw)
        .map_err(|e| GuardError::BadRequest(format!("invalid percent-encoding in {raw:?}: {e}")))
}

/// `{user_id}` of `/v1/admin/blocks/{user_id}`, still percent-encoded.
fn blocked_user_segment(path: &str) -> Option<&str> {
    let user = path.strip_prefix(BLOCKS_PATH)?.strip_prefix('/')?;
    (!user.is_empty() && !user.contains('/')).then_some(user)
}

/// First value of `name` in a raw query string, still percent-encoded.
fn query_param<'a>(query: Option<&'a str>, name: &str) -> Option<&'a str> {
    query?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == name).then_some(value)
    })
}
