//! Tests for config loading, validation, the deterministic run id, and
//! policy merging.

use mcbench_core::config::{
    build_run_manifest, load_run_config, validate_config, BenchmarkSpec, ProviderKind,
    ProviderSpec, RunConfig,
};
use mcbench_core::error::McbenchError;
use mcbench_core::policy::{merge_policy, RuntimePolicy};
use std::fs;
use tempfile::tempdir;

fn base_config() -> RunConfig {
    RunConfig {
        run_name: "baseline".into(),
        seed: 42,
        providers: vec![ProviderSpec {
            provider: ProviderKind::Openai,
            model: "gpt-4o-mini".into(),
            api_key_env: None,
            temperature: 0.0,
            max_tokens: 512,
        }],
        benchmark: BenchmarkSpec::default(),
        policy: RuntimePolicy::default(),
    }
}

#[test]
fn identical_configs_yield_identical_run_ids() {
    let policy = RuntimePolicy::default();
    let a = build_run_manifest(&base_config(), &policy).unwrap();
    let b = build_run_manifest(&base_config(), &policy).unwrap();
    assert_eq!(a.run_id, b.run_id);
    assert_eq!(a.run_id.len(), 16);
}

#[test]
fn run_id_changes_with_identity_fields() {
    let policy = RuntimePolicy::default();
    let base = build_run_manifest(&base_config(), &policy).unwrap();

    let mut other_seed = base_config();
    other_seed.seed = 43;
    assert_ne!(
        base.run_id,
        build_run_manifest(&other_seed, &policy).unwrap().run_id
    );

    let mut other_name = base_config();
    other_name.run_name = "nightly".into();
    assert_ne!(
        base.run_id,
        build_run_manifest(&other_name, &policy).unwrap().run_id
    );

    let mut other_model = base_config();
    other_model.providers[0].model = "gpt-4o".into();
    assert_ne!(
        base.run_id,
        build_run_manifest(&other_model, &policy).unwrap().run_id
    );
}

#[test]
fn validation_rejects_bad_configs() {
    let mut empty = base_config();
    empty.providers.clear();
    assert!(matches!(
        validate_config(&empty),
        Err(McbenchError::Config(_))
    ));

    let mut hot = base_config();
    hot.providers[0].temperature = 2.5;
    assert!(matches!(validate_config(&hot), Err(McbenchError::Config(_))));

    let mut unknown = base_config();
    unknown.benchmark.name = "trivia".into();
    assert!(matches!(
        validate_config(&unknown),
        Err(McbenchError::Config(_))
    ));
}

#[test]
fn loads_yaml_with_defaults_applied() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.yaml");
    fs::write(
        &path,
        r#"
run_name: nightly
providers:
  - provider: anthropic
    model: claude-3-5-haiku
"#,
    )
    .unwrap();

    let cfg = load_run_config(&path).unwrap();
    assert_eq!(cfg.run_name, "nightly");
    assert_eq!(cfg.seed, 42);
    assert_eq!(cfg.providers.len(), 1);
    assert_eq!(cfg.providers[0].provider, ProviderKind::Anthropic);
    assert_eq!(cfg.providers[0].max_tokens, 512);
    assert_eq!(cfg.benchmark.name, "mmlu_subset");
    assert_eq!(cfg.policy.reliability.retry.max_attempts, 3);
}

#[test]
fn load_rejects_invalid_yaml_configs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.yaml");
    fs::write(&path, "run_name: broken\nproviders: []\n").unwrap();
    assert!(load_run_config(&path).is_err());
}

#[test]
fn policy_file_overrides_only_the_keys_it_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("policy.yaml");
    fs::write(
        &path,
        r#"
reliability:
  provider_error_rate:
    hard_stop_percent: 25
budget:
  enforce_hard_stop: false
"#,
    )
    .unwrap();

    let base = RuntimePolicy::default();
    let merged = merge_policy(&base, &path).unwrap();

    assert_eq!(merged.reliability.provider_error_rate.hard_stop_percent, 25.0);
    assert!(!merged.budget.enforce_hard_stop);
    // Everything else keeps the base values.
    assert_eq!(
        merged.reliability.provider_error_rate.window_size_requests,
        base.reliability.provider_error_rate.window_size_requests
    );
    assert_eq!(merged.reliability.retry, base.reliability.retry);
    assert_eq!(merged.security, base.security);
    // And the base itself was not touched.
    assert_eq!(base, RuntimePolicy::default());
}
