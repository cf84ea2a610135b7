//! Run configuration loading and the deterministic run manifest.
//!
//! Configuration is loaded via figment from two layers:
//! 1. YAML file (with `${VAR:-default}` interpolation)
//! 2. Environment variables (`MCBENCH_` prefix, `__` as nested separator)

use chrono::Utc;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

use crate::error::{McbenchError, Result};
use crate::policy::RuntimePolicy;

pub const RUN_ID_HEX_LEN: usize = 16;
pub const FINGERPRINT_HEX_LEN: usize = 24;

fn default_run_name() -> String {
    "baseline".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_temperature() -> f64 {
    0.0
}

fn default_max_tokens() -> u32 {
    512
}

fn default_benchmark_name() -> String {
    "mmlu_subset".to_string()
}

fn default_split() -> String {
    "dev".to_string()
}

fn default_dataset_path() -> String {
    "data/benchmarks/mmlu_subset/dev.jsonl".to_string()
}

fn default_max_samples() -> Option<usize> {
    Some(50)
}

/// The closed set of provider integrations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Openai,
    Anthropic,
    Gemini,
    Groq,
    Local,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
            ProviderKind::Local => "local",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Local => "",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One system under test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSpec {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderSpec {
    /// Identifier used in artifacts and reports: disambiguates multiple
    /// models from the same provider.
    pub fn system_id(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkSpec {
    #[serde(default = "default_benchmark_name")]
    pub name: String,
    #[serde(default = "default_split")]
    pub split: String,
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,
    #[serde(default = "default_max_samples")]
    pub max_samples: Option<usize>,
}

impl Default for BenchmarkSpec {
    fn default() -> Self {
        Self {
            name: default_benchmark_name(),
            split: default_split(),
            dataset_path: default_dataset_path(),
            max_samples: default_max_samples(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default = "default_run_name")]
    pub run_name: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub providers: Vec<ProviderSpec>,
    #[serde(default)]
    pub benchmark: BenchmarkSpec,
    #[serde(default)]
    pub policy: RuntimePolicy,
}

/// Immutable description of a run, written once to `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: String,
    pub run_name: String,
    pub created_at: String,
    pub seed: u64,
    pub benchmark: BenchmarkSpec,
    pub providers: Vec<ProviderSpec>,
    pub policy_snapshot: RuntimePolicy,
}

// ============================================================================
// LOADING
// ============================================================================

pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let interpolated = interpolate_env_vars(&contents);

    let cfg: RunConfig = Figment::new()
        .merge(Yaml::string(&interpolated))
        .merge(Env::prefixed("MCBENCH_").split("__"))
        .extract()?;
    validate_config(&cfg)?;
    Ok(cfg)
}

fn interpolate_env_vars(input: &str) -> String {
    use once_cell::sync::Lazy;
    use regex::Regex;
    use std::env;

    static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid regex")
    });

    ENV_VAR_RE
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_val = caps.get(2).map(|m| m.as_str());
            match env::var(var_name) {
                Ok(val) => val,
                Err(_) => default_val.unwrap_or("").to_string(),
            }
        })
        .to_string()
}

pub fn validate_config(cfg: &RunConfig) -> Result<()> {
    if cfg.providers.is_empty() {
        return Err(McbenchError::Config(
            "at least one provider is required".into(),
        ));
    }
    for spec in &cfg.providers {
        if spec.model.trim().is_empty() {
            return Err(McbenchError::Config(format!(
                "provider '{}' must name a model",
                spec.provider
            )));
        }
        if !(0.0..=2.0).contains(&spec.temperature) {
            return Err(McbenchError::Config(format!(
                "temperature {} for {} is out of range [0, 2]",
                spec.temperature,
                spec.system_id()
            )));
        }
        if spec.max_tokens == 0 {
            return Err(McbenchError::Config(format!(
                "max_tokens must be positive for {}",
                spec.system_id()
            )));
        }
    }
    if cfg.benchmark.name != "mmlu_subset" {
        return Err(McbenchError::Config(format!(
            "unknown benchmark '{}'; only 'mmlu_subset' is supported",
            cfg.benchmark.name
        )));
    }
    Ok(())
}

/// Load a `.env` file, setting only variables that are not already set.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(());
    }
    for raw_line in std::fs::read_to_string(path)?.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || std::env::var_os(key).is_some() {
            continue;
        }
        let value = value.trim().trim_matches('"').trim_matches('\'');
        std::env::set_var(key, value);
    }
    Ok(())
}

// ============================================================================
// MANIFEST / FINGERPRINTING
// ============================================================================

/// Derive the manifest for a config. The run_id is a truncated hash of the
/// identity-relevant fields, so re-executing an identical configuration
/// resolves to the same run directory and becomes a resume.
pub fn build_run_manifest(config: &RunConfig, policy: &RuntimePolicy) -> Result<RunManifest> {
    let fingerprint_payload = serde_json::json!({
        "run_name": config.run_name,
        "seed": config.seed,
        "benchmark": serde_json::to_value(&config.benchmark)?,
        "providers": serde_json::to_value(&config.providers)?,
    });
    let run_id = canonical_hash(&fingerprint_payload, RUN_ID_HEX_LEN);
    Ok(RunManifest {
        run_id,
        run_name: config.run_name.clone(),
        created_at: Utc::now().to_rfc3339(),
        seed: config.seed,
        benchmark: config.benchmark.clone(),
        providers: config.providers.clone(),
        policy_snapshot: policy.clone(),
    })
}

/// SHA-256 over a canonical (sorted-key) JSON rendering, truncated to
/// `hex_len` characters. The truncation length is kept short for readable
/// artifact paths; the residual collision risk is accepted.
pub fn canonical_hash(value: &Value, hex_len: usize) -> String {
    let canonical = canonical_json_string(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..hex_len.min(digest.len())].to_string()
}

fn canonical_json_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(arr) => {
            let inner: Vec<String> = arr.iter().map(canonical_json_string).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json_string(v)
                    )
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_env_vars() {
        std::env::set_var("MCBENCH_TEST_VAR", "hello");
        let output = interpolate_env_vars("value: ${MCBENCH_TEST_VAR}");
        assert_eq!(output, "value: hello");
        std::env::remove_var("MCBENCH_TEST_VAR");
    }

    #[test]
    fn interpolates_with_default() {
        std::env::remove_var("MCBENCH_NONEXISTENT_VAR");
        let output = interpolate_env_vars("value: ${MCBENCH_NONEXISTENT_VAR:-fallback}");
        assert_eq!(output, "value: fallback");
    }

    #[test]
    fn canonical_hash_sorts_keys() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(canonical_hash(&a, 24), canonical_hash(&b, 24));
        assert_eq!(canonical_hash(&a, 24).len(), 24);
    }

    #[test]
    fn system_id_disambiguates_models() {
        let spec = ProviderSpec {
            provider: ProviderKind::Openai,
            model: "gpt-4o-mini".into(),
            api_key_env: None,
            temperature: 0.0,
            max_tokens: 512,
        };
        assert_eq!(spec.system_id(), "openai:gpt-4o-mini");
        assert_eq!(spec.api_key_env(), "OPENAI_API_KEY");
    }
}
