//! Shared data types persisted in run artifacts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One row in `results.jsonl`, appended per successful (system, sample) attempt.
///
/// The set of `request_fingerprint` values present in this log is what defines
/// "already completed" when a run is resumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    pub run_id: String,
    pub system_id: String,
    pub provider: String,
    pub model: String,
    pub sample_id: String,
    pub category: String,
    pub request_fingerprint: String,
    #[serde(default)]
    pub predicted: Option<String>,
    pub expected: String,
    pub is_correct: bool,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub usage: Option<Value>,
    #[serde(default)]
    pub response_text: String,
}

/// One row in `errors.jsonl`, appended when retries are exhausted or a
/// non-retryable failure occurs. Informational only: an error row never marks
/// a sample as completed, so the sample stays eligible on the next invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorRecord {
    pub run_id: String,
    pub system_id: String,
    pub sample_id: String,
    pub request_fingerprint: String,
    pub error_kind: String,
    pub error: String,
    pub attempt: u32,
}

/// Terminal status of a run invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    StoppedDueToErrorRate,
}

/// Live counters per system under test, finalized into the summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemMetrics {
    pub requests: u64,
    pub errors: u64,
    pub correct: u64,
    pub attempted: u64,
    #[serde(default)]
    pub accuracy: f64,
}

impl SystemMetrics {
    pub fn error_rate_percent(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            (self.errors as f64 / self.requests as f64) * 100.0
        }
    }
}

/// Per-run rollup written to `summary.json` at termination (normal or
/// early-stopped). Also the engine's return value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub total_requests: u64,
    pub total_errors: u64,
    pub provider_metrics: BTreeMap<String, SystemMetrics>,
}

/// Payload stored in the response cache, keyed by request fingerprint.
/// Immutable once written; never invalidated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedResponse {
    pub text: String,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub usage: Option<Value>,
}
