use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::error::{GuardError, Result};

pub type RespBody = BoxBody<Bytes, hyper::Error>;

pub(crate) fn full(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Serialize `body` as a JSON response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<RespBody>> {
    let body_bytes = serde_json::to_vec(body)
        .map_err(|e| GuardError::Http(format!("Failed to serialize response: {e}")))?;

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full(body_bytes))
        .map_err(|e| GuardError::Http(format!("Failed to build response: {e}")))
}

/// Plain text response; cannot fail.
pub fn text_response(status: StatusCode, text: &'static str) -> Response<RespBody> {
    let mut resp = Response::new(full(text));
    *resp.status_mut() = status;
    resp
}

/// `{"error": message}` with the given status, falling back to plain text.
pub fn error_response(status: StatusCode, message: &str) -> Response<RespBody> {
    json_response(status, &json!({ "error": message }))
        .unwrap_or_else(|_| text_response(status, "Error"))
}
