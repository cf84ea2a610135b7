//! Google Gemini generateContent client.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::time::Instant;

use super::{
    resolve_api_key, HttpTransport, InferenceRequest, InferenceResponse, ProviderClient,
    ProviderError,
};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    model: String,
    api_key_env: String,
    transport: HttpTransport,
}

impl GeminiClient {
    pub fn new(model: String, api_key_env: String, transport: HttpTransport) -> Self {
        Self {
            model,
            api_key_env,
            transport,
        }
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    async fn generate(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, ProviderError> {
        let api_key = resolve_api_key(&self.api_key_env)?;
        let url = format!("{BASE_URL}/{}:generateContent?key={api_key}", self.model);

        let payload = serde_json::json!({
            "contents": [{"parts": [{"text": request.prompt}]}],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            },
        });

        let started = Instant::now();
        let data = self
            .transport
            .post_json(&url, HeaderMap::new(), &payload)
            .await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let text = data
            .pointer("/candidates/0/content/parts")
            .and_then(|v| v.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(InferenceResponse {
            text,
            model: self.model.clone(),
            latency_ms,
            usage: data.get("usageMetadata").cloned(),
        })
    }
}
