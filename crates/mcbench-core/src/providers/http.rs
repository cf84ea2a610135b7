//! Shared HTTP plumbing for provider clients.

use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;

use super::ProviderError;
use crate::error::{McbenchError, Result};

const ERROR_BODY_LIMIT: usize = 500;

/// A reqwest client with the policy's request timeout applied.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| McbenchError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// POST a JSON payload and decode a JSON response.
    ///
    /// Non-success statuses become [`ProviderError::RetryableHttp`] carrying
    /// the status code (retryability itself is a policy decision); connection
    /// and timeout failures become [`ProviderError::Transport`].
    pub async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        payload: &Value,
    ) -> std::result::Result<Value, ProviderError> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(ProviderError::RetryableHttp {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Transport(format!("invalid JSON response: {e}")))
    }
}
