//! The evaluation run engine.
//!
//! Drives the provider × sample matrix sequentially: fingerprint each
//! request, skip what the result log already holds, serve cache hits without
//! a provider call, retry transient HTTP failures with bounded backoff, and
//! stop the whole run early if a provider's error rate crosses the policy's
//! hard-stop threshold. Every (provider, sample) pair is executed exactly
//! once across the run's lifetime, including across process restarts sharing
//! the same run_id.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::config::{
    build_run_manifest, canonical_hash, ProviderSpec, RunConfig, FINGERPRINT_HEX_LEN,
};
use crate::dataset::{get_dataset_loader, option_letter, Sample};
use crate::error::Result;
use crate::policy::{redact_secrets, RetryPolicy, RuntimePolicy};
use crate::providers::{
    build_provider_client, InferenceRequest, ProviderClient, ProviderError,
};
use crate::store::ArtifactStore;
use crate::types::{
    CachedResponse, ErrorRecord, ResultRecord, RunStatus, RunSummary, SystemMetrics,
};

/// The engine's return value is the same rollup that lands in `summary.json`.
pub type ExecutionSummary = RunSummary;

static OPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z])\b").expect("valid regex"));

/// First standalone uppercase letter anywhere in the upper-cased text.
/// Tolerates preambles like "The answer is B."; first match wins.
pub fn extract_option_letter(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    OPTION_RE
        .captures(&upper)
        .map(|caps| caps[1].to_string())
}

/// Stable hash identifying a unique request; identical fingerprint means
/// identical request, which is what makes caching and resumption idempotent.
pub fn request_fingerprint(spec: &ProviderSpec, sample_id: &str, prompt: &str) -> String {
    let payload = serde_json::json!({
        "provider": spec.provider.as_str(),
        "model": spec.model,
        "sample_id": sample_id,
        "prompt": prompt,
        "temperature": spec.temperature,
        "max_tokens": spec.max_tokens,
    });
    canonical_hash(&payload, FINGERPRINT_HEX_LEN)
}

/// Builds provider clients for the engine. Injectable so tests can substitute
/// scripted clients for the HTTP integrations.
pub trait ClientFactory: Send + Sync {
    fn build(&self, spec: &ProviderSpec, timeout_seconds: u64) -> Result<Box<dyn ProviderClient>>;
}

/// Default factory backed by the real HTTP clients.
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn build(&self, spec: &ProviderSpec, timeout_seconds: u64) -> Result<Box<dyn ProviderClient>> {
        build_provider_client(spec, timeout_seconds)
    }
}

pub struct RunEngine {
    config: RunConfig,
    policy: RuntimePolicy,
    artifacts_root: PathBuf,
    client_factory: Arc<dyn ClientFactory>,
}

impl RunEngine {
    pub fn new(
        config: RunConfig,
        policy: RuntimePolicy,
        artifacts_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            policy,
            artifacts_root: artifacts_root.into(),
            client_factory: Arc::new(HttpClientFactory),
        }
    }

    /// Substitute the provider client factory (used by tests).
    pub fn with_client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.client_factory = factory;
        self
    }

    /// Execute the run to completion or early stop.
    ///
    /// The only suspension points are provider calls and backoff sleeps, so
    /// dropping the returned future (e.g. on a shutdown signal) cancels
    /// between persisted steps and the run resumes cleanly later.
    pub async fn run(&self) -> Result<ExecutionSummary> {
        let manifest = build_run_manifest(&self.config, &self.policy)?;
        let store = ArtifactStore::new(&self.artifacts_root, &manifest.run_id)?;
        let cache = ResponseCache::new(store.run_dir().join("cache"))?;
        store.write_manifest(&manifest)?;

        // Fatal before any provider call: missing file or malformed line.
        let samples = get_dataset_loader(&self.config.benchmark)?.load()?;

        let completed = store.load_completed_fingerprints()?;
        if !completed.is_empty() {
            info!(
                run_id = %manifest.run_id,
                completed = completed.len(),
                "resuming run"
            );
        } else {
            info!(run_id = %manifest.run_id, samples = samples.len(), "starting run");
        }

        let mut metrics: BTreeMap<String, SystemMetrics> = self
            .config
            .providers
            .iter()
            .map(|spec| (spec.system_id(), SystemMetrics::default()))
            .collect();
        let mut total_requests: u64 = 0;
        let mut total_errors: u64 = 0;

        let timeout = self.policy.reliability.request_timeout_seconds;
        let retry = &self.policy.reliability.retry;

        for spec in &self.config.providers {
            let system_id = spec.system_id();
            let client = self.client_factory.build(spec, timeout)?;

            for sample in &samples {
                let prompt = sample.prompt();
                let fingerprint = request_fingerprint(spec, &sample.sample_id, &prompt);
                if completed.contains(&fingerprint) {
                    continue;
                }

                {
                    let m = metrics.get_mut(&system_id).expect("system metrics exist");
                    m.requests += 1;
                    m.attempted += 1;
                }
                total_requests += 1;

                let response = match cache.get(&fingerprint)? {
                    Some(hit) => {
                        debug!(%fingerprint, system = %system_id, "cache hit");
                        Some(hit)
                    }
                    None => {
                        self.invoke_with_retry(
                            client.as_ref(),
                            &manifest.run_id,
                            spec,
                            sample,
                            &prompt,
                            &fingerprint,
                            retry,
                            &cache,
                            &store,
                            &mut metrics,
                            &mut total_errors,
                        )
                        .await?
                    }
                };

                if let Some(resp) = response {
                    let predicted = extract_option_letter(&resp.text);
                    let expected = option_letter(sample.answer_index).to_string();
                    let is_correct = predicted.as_deref() == Some(expected.as_str());
                    if is_correct {
                        let m = metrics.get_mut(&system_id).expect("system metrics exist");
                        m.correct += 1;
                    }
                    store.append_result(&ResultRecord {
                        run_id: manifest.run_id.clone(),
                        system_id: system_id.clone(),
                        provider: spec.provider.to_string(),
                        model: spec.model.clone(),
                        sample_id: sample.sample_id.clone(),
                        category: sample.category.clone(),
                        request_fingerprint: fingerprint,
                        predicted,
                        expected,
                        is_correct,
                        latency_ms: resp.latency_ms,
                        usage: resp.usage,
                        response_text: resp.text,
                    })?;
                }

                // Circuit breaker: checked after every attempt, success or
                // failure, once this provider has filled its request window.
                let m = metrics.get(&system_id).expect("system metrics exist");
                let window = self.policy.reliability.provider_error_rate.window_size_requests;
                let hard_stop = self.policy.reliability.provider_error_rate.hard_stop_percent;
                if self.policy.budget.enforce_hard_stop
                    && m.requests >= window
                    && m.error_rate_percent() > hard_stop
                {
                    warn!(
                        system = %system_id,
                        error_rate = m.error_rate_percent(),
                        "error rate exceeded hard stop; abandoning run"
                    );
                    let summary = finalize(
                        &manifest.run_id,
                        RunStatus::StoppedDueToErrorRate,
                        total_requests,
                        total_errors,
                        metrics,
                    );
                    store.write_summary(&summary)?;
                    return Ok(summary);
                }
            }
        }

        let summary = finalize(
            &manifest.run_id,
            RunStatus::Completed,
            total_requests,
            total_errors,
            metrics,
        );
        store.write_summary(&summary)?;
        info!(
            run_id = %summary.run_id,
            requests = summary.total_requests,
            errors = summary.total_errors,
            "run completed"
        );
        Ok(summary)
    }

    /// Invoke the provider with bounded retries. Returns the response on
    /// success (after writing it to the cache), or `None` after a terminal
    /// failure (which appends an error record but no result row, leaving the
    /// sample eligible for a future resumed run).
    #[allow(clippy::too_many_arguments)]
    async fn invoke_with_retry(
        &self,
        client: &dyn ProviderClient,
        run_id: &str,
        spec: &ProviderSpec,
        sample: &Sample,
        prompt: &str,
        fingerprint: &str,
        retry: &RetryPolicy,
        cache: &ResponseCache,
        store: &ArtifactStore,
        metrics: &mut BTreeMap<String, SystemMetrics>,
        total_errors: &mut u64,
    ) -> Result<Option<CachedResponse>> {
        let system_id = spec.system_id();
        let request = InferenceRequest {
            prompt: prompt.to_string(),
            temperature: spec.temperature,
            max_tokens: spec.max_tokens,
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match client.generate(&request).await {
                Ok(resp) => {
                    let payload = CachedResponse {
                        text: resp.text,
                        latency_ms: resp.latency_ms,
                        usage: resp.usage,
                    };
                    // Only the path that actually called the provider writes
                    // the cache; hits are never re-written.
                    cache.set(fingerprint, &payload)?;
                    return Ok(Some(payload));
                }
                Err(err) => {
                    if attempt < retry.max_attempts && is_retryable(&err, retry) {
                        let backoff = retry.backoff_for_attempt(attempt);
                        warn!(
                            system = %system_id,
                            sample = %sample.sample_id,
                            attempt,
                            backoff_seconds = backoff,
                            error = %err,
                            "retryable provider failure"
                        );
                        tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
                        continue;
                    }

                    let m = metrics.get_mut(&system_id).expect("system metrics exist");
                    m.errors += 1;
                    *total_errors += 1;

                    let message = if self.policy.security.redact_secrets_in_logs {
                        redact_secrets(&err.to_string())
                    } else {
                        err.to_string()
                    };
                    warn!(
                        system = %system_id,
                        sample = %sample.sample_id,
                        attempt,
                        kind = err.kind(),
                        "provider failure recorded"
                    );
                    store.append_error(&ErrorRecord {
                        run_id: run_id.to_string(),
                        system_id: system_id.clone(),
                        sample_id: sample.sample_id.clone(),
                        request_fingerprint: fingerprint.to_string(),
                        error_kind: err.kind().to_string(),
                        error: message,
                        attempt,
                    })?;
                    return Ok(None);
                }
            }
        }
    }
}

fn is_retryable(err: &ProviderError, retry: &RetryPolicy) -> bool {
    match err.status_code() {
        Some(status) => retry.retryable_status_codes.contains(&status),
        None => false,
    }
}

fn finalize(
    run_id: &str,
    status: RunStatus,
    total_requests: u64,
    total_errors: u64,
    mut metrics: BTreeMap<String, SystemMetrics>,
) -> RunSummary {
    for m in metrics.values_mut() {
        m.accuracy = if m.attempted == 0 {
            0.0
        } else {
            m.correct as f64 / m.attempted as f64
        };
    }
    RunSummary {
        run_id: run_id.to_string(),
        status,
        total_requests,
        total_errors,
        provider_metrics: metrics,
    }
}
