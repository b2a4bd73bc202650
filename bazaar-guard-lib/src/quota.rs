//! Remote quota check.
//!
//! The quota service is an external collaborator answering "may this user
//! perform this action again within the window?". Its answer is advisory:
//! the [`Guard`](crate::guard::Guard) decides what a failure means.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RemoteQuotaConfig;
use crate::error::{GuardError, Result};
use crate::guard::{ActionType, UserId};

/// Answer of the quota service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub total: u32,
    #[serde(default)]
    pub reset_in_seconds: u64,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
pub trait QuotaCheck: Send + Sync {
    async fn check_rate_limit(
        &self,
        user: &UserId,
        action: &ActionType,
        limit: u32,
        window_minutes: u64,
    ) -> Result<QuotaDecision>;
}

#[derive(Debug, Serialize)]
struct QuotaRequest<'a> {
    user_id: &'a str,
    action_type: &'a str,
    limit: u32,
    window_minutes: u64,
}

/// [`QuotaCheck`] backed by a JSON-over-HTTP endpoint.
///
/// Sends `POST <url>` with `{ user_id, action_type, limit, window_minutes }`
/// and expects a [`QuotaDecision`] body.
pub struct HttpQuotaClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpQuotaClient {
    pub fn new(config: &RemoteQuotaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GuardError::Config(format!("Failed to build quota client: {e}")))?;

        Ok(Self { client, url: config.url.clone(), api_key: config.api_key.clone() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QuotaCheck for HttpQuotaClient {
    async fn check_rate_limit(
        &self,
        user: &UserId,
        action: &ActionType,
        limit: u32,
        window_minutes: u64,
    ) -> Result<QuotaDecision> {
        let body = QuotaRequest {
            user_id: user.as_str(),
            action_type: action.as_str(),
            limit,
            window_minutes,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GuardError::Remote(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| GuardError::Remote(format!("unexpected status: {e}")))?;

        response
            .json::<QuotaDecision>()
            .await
            .map_err(|e| GuardError::Remote(format!("invalid response body: {e}")))
    }
}
