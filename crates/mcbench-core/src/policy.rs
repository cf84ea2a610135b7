//! Runtime policy: budget, reliability, and security knobs.
//!
//! Policies come from two layers: defaults embedded in the run config and an
//! optional site-wide policy YAML. [`merge_policy`] combines them into a new
//! immutable [`RuntimePolicy`] value; nothing is mutated in place.

use figment::{
    providers::{Format, Serialized, Yaml},
    Figment,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

// ============================================================================
// DEFAULTS (all in one place)
// ============================================================================

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_seconds() -> Vec<f64> {
    vec![1.0, 2.0, 4.0]
}

fn default_retryable_status_codes() -> Vec<u16> {
    vec![408, 429, 500, 502, 503, 504]
}

fn default_max_parallel_requests() -> usize {
    3
}

fn default_request_timeout_seconds() -> u64 {
    45
}

fn default_window_size_requests() -> u64 {
    50
}

fn default_hard_stop_percent() -> f64 {
    10.0
}

fn default_max_usd_per_run() -> f64 {
    5.0
}

fn default_warn_at_percent() -> u32 {
    80
}

fn default_true() -> bool {
    true
}

fn default_allowed_secret_env_vars() -> Vec<String> {
    ["ANTHROPIC_API_KEY", "OPENAI_API_KEY", "GEMINI_API_KEY"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ============================================================================
// POLICY MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff per attempt index; clamped to the last entry once attempts
    /// exceed the list length.
    #[serde(default = "default_backoff_seconds")]
    pub backoff_seconds: Vec<f64>,
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_seconds: default_backoff_seconds(),
            retryable_status_codes: default_retryable_status_codes(),
        }
    }
}

impl RetryPolicy {
    /// Backoff for a 1-based attempt number.
    pub fn backoff_for_attempt(&self, attempt: u32) -> f64 {
        if self.backoff_seconds.is_empty() {
            return 0.0;
        }
        let idx = (attempt.saturating_sub(1) as usize).min(self.backoff_seconds.len() - 1);
        self.backoff_seconds[idx]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorRatePolicy {
    /// Minimum requests per system before the breaker may trip.
    #[serde(default = "default_window_size_requests")]
    pub window_size_requests: u64,
    #[serde(default = "default_hard_stop_percent")]
    pub hard_stop_percent: f64,
}

impl Default for ErrorRatePolicy {
    fn default() -> Self {
        Self {
            window_size_requests: default_window_size_requests(),
            hard_stop_percent: default_hard_stop_percent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReliabilityPolicy {
    #[serde(default = "default_max_parallel_requests")]
    pub max_parallel_requests: usize,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub provider_error_rate: ErrorRatePolicy,
}

impl Default for ReliabilityPolicy {
    fn default() -> Self {
        Self {
            max_parallel_requests: default_max_parallel_requests(),
            request_timeout_seconds: default_request_timeout_seconds(),
            retry: RetryPolicy::default(),
            provider_error_rate: ErrorRatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetPolicy {
    #[serde(default = "default_max_usd_per_run")]
    pub max_usd_per_run: f64,
    #[serde(default = "default_warn_at_percent")]
    pub warn_at_percent: u32,
    #[serde(default = "default_true")]
    pub enforce_hard_stop: bool,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            max_usd_per_run: default_max_usd_per_run(),
            warn_at_percent: default_warn_at_percent(),
            enforce_hard_stop: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityPolicy {
    #[serde(default = "default_true")]
    pub byok_only: bool,
    #[serde(default)]
    pub persist_user_api_keys: bool,
    #[serde(default = "default_true")]
    pub redact_secrets_in_logs: bool,
    #[serde(default = "default_allowed_secret_env_vars")]
    pub allowed_secret_env_vars: Vec<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            byok_only: true,
            persist_user_api_keys: false,
            redact_secrets_in_logs: true,
            allowed_secret_env_vars: default_allowed_secret_env_vars(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimePolicy {
    #[serde(default)]
    pub budget: BudgetPolicy,
    #[serde(default)]
    pub reliability: ReliabilityPolicy,
    #[serde(default)]
    pub security: SecurityPolicy,
}

// ============================================================================
// MERGING
// ============================================================================

/// Layer a policy YAML file over a base policy, returning a new value.
///
/// A missing file yields the base unchanged; partial files override only the
/// keys they name.
pub fn merge_policy(base: &RuntimePolicy, policy_path: impl AsRef<Path>) -> Result<RuntimePolicy> {
    let merged: RuntimePolicy = Figment::from(Serialized::defaults(base))
        .merge(Yaml::file(policy_path.as_ref()))
        .extract()?;
    Ok(merged)
}

// ============================================================================
// SECRET REDACTION
// ============================================================================

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"sk-[A-Za-z0-9_\-]{8,}").expect("valid regex"),
        Regex::new(r"AIza[0-9A-Za-z_\-]{16,}").expect("valid regex"),
    ]
});

/// Strip API-key-shaped substrings from text destined for logs or artifacts.
pub fn redact_secrets(text: &str) -> String {
    let mut redacted = text.to_string();
    for pattern in SECRET_PATTERNS.iter() {
        redacted = pattern.replace_all(&redacted, "[REDACTED_KEY]").to_string();
    }
    redacted
}
