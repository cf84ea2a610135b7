//! OpenAI-compatible chat completions client (also serves groq).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Instant;

use super::{
    resolve_api_key, HttpTransport, InferenceRequest, InferenceResponse, ProviderClient,
    ProviderError,
};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct OpenAiClient {
    model: String,
    api_key_env: String,
    base_url: String,
    transport: HttpTransport,
}

impl OpenAiClient {
    pub fn new(
        model: String,
        api_key_env: String,
        base_url: impl Into<String>,
        transport: HttpTransport,
    ) -> Self {
        Self {
            model,
            api_key_env,
            base_url: base_url.into(),
            transport,
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    async fn generate(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, ProviderError> {
        let api_key = resolve_api_key(&self.api_key_env)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| ProviderError::NonRetryable(format!("invalid API key: {e}")))?,
        );

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let started = Instant::now();
        let data = self
            .transport
            .post_json(&format!("{}/chat/completions", self.base_url), headers, &payload)
            .await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let text = data
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
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
