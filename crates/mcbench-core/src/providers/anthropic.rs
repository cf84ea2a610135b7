//! Anthropic messages API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Instant;

use super::{
    resolve_api_key, HttpTransport, InferenceRequest, InferenceResponse, ProviderClient,
    ProviderError,
};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    model: String,
    api_key_env: String,
    transport: HttpTransport,
}

impl AnthropicClient {
    pub fn new(model: String, api_key_env: String, transport: HttpTransport) -> Self {
        Self {
            model,
            api_key_env,
            transport,
        }
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    async fn generate(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, ProviderError> {
        let api_key = resolve_api_key(&self.api_key_env)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|e| ProviderError::NonRetryable(format!("invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let payload = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        let started = Instant::now();
        let data = self.transport.post_json(MESSAGES_URL, headers, &payload).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        // Concatenate the text blocks of the response content.
        let text = data
            .get("content")
            .and_then(|v| v.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
            .trim()
            .to_string();
        let model = data
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.model)
            .to_string();

        Ok(InferenceResponse {
            text,
            model,
            latency_ms,
            usage: data.get("usage").cloned(),
        })
    }
}
