//! Provider clients: the single-operation `generate` capability.
//!
//! The engine only depends on [`ProviderClient`]; concrete integrations are
//! selected by [`build_provider_client`] keyed on the provider kind.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{ProviderKind, ProviderSpec, RunConfig};
use crate::error::{McbenchError, Result};
use crate::policy::redact_secrets;

mod http;
pub use http::HttpTransport;

mod anthropic;
mod gemini;
mod openai;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResponse {
    pub text: String,
    pub model: String,
    pub latency_ms: u64,
    pub usage: Option<Value>,
}

/// Closed set of provider failure kinds. The retry decision is a pure
/// function of this enum plus the policy's retryable status set; only
/// `RetryableHttp` variants are ever candidates for retry.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {message}")]
    RetryableHttp { status: u16, message: String },
    #[error("{0}")]
    NonRetryable(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Stable identifier recorded in the error log.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::RetryableHttp { .. } => "retryable_http",
            ProviderError::NonRetryable(_) => "non_retryable",
            ProviderError::Transport(_) => "transport",
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::RetryableHttp { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn generate(&self, request: &InferenceRequest)
        -> std::result::Result<InferenceResponse, ProviderError>;
}

/// Build a client for a provider spec.
///
/// The `local` kind is accepted in configuration for forward compatibility
/// but has no client implementation yet.
pub fn build_provider_client(
    spec: &ProviderSpec,
    timeout_seconds: u64,
) -> Result<Box<dyn ProviderClient>> {
    let transport = HttpTransport::new(timeout_seconds)?;
    let api_key_env = spec.api_key_env().to_string();
    match spec.provider {
        ProviderKind::Openai => Ok(Box::new(OpenAiClient::new(
            spec.model.clone(),
            api_key_env,
            openai::OPENAI_BASE_URL,
            transport,
        ))),
        ProviderKind::Groq => Ok(Box::new(OpenAiClient::new(
            spec.model.clone(),
            api_key_env,
            openai::GROQ_BASE_URL,
            transport,
        ))),
        ProviderKind::Anthropic => Ok(Box::new(AnthropicClient::new(
            spec.model.clone(),
            api_key_env,
            transport,
        ))),
        ProviderKind::Gemini => Ok(Box::new(GeminiClient::new(
            spec.model.clone(),
            api_key_env,
            transport,
        ))),
        ProviderKind::Local => Err(McbenchError::Config(
            "provider 'local' has no client implementation".into(),
        )),
    }
}

fn resolve_api_key(api_key_env: &str) -> std::result::Result<String, ProviderError> {
    match std::env::var(api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ProviderError::NonRetryable(format!(
            "missing API key in env var: {api_key_env}"
        ))),
    }
}

// ============================================================================
// CONNECTIVITY CHECK
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityResult {
    pub system_id: String,
    pub ok: bool,
    pub detail: String,
}

/// Issue a one-token probe per configured provider. Failures are reported
/// per system (with secrets redacted), never propagated.
pub async fn check_connectivity(config: &RunConfig) -> Vec<ConnectivityResult> {
    let timeout = config.policy.reliability.request_timeout_seconds;
    let probe = InferenceRequest {
        prompt: "Reply with only the letter A.".to_string(),
        temperature: 0.0,
        max_tokens: 8,
    };

    let mut results = Vec::with_capacity(config.providers.len());
    for spec in &config.providers {
        let outcome = match build_provider_client(spec, timeout) {
            Ok(client) => client.generate(&probe).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let (ok, detail) = match outcome {
            Ok(resp) => (true, format!("ok ({} chars)", resp.text.trim().len())),
            Err(msg) => (false, redact_secrets(&msg)),
        };
        results.push(ConnectivityResult {
            system_id: spec.system_id(),
            ok,
            detail,
        });
    }
    results
}
