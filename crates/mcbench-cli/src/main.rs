//! CLI for mcbench - benchmark LLM providers on multiple-choice question sets.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcbench_core::config::{build_run_manifest, load_env_file, load_run_config};
use mcbench_core::engine::RunEngine;
use mcbench_core::policy::merge_policy;
use mcbench_core::providers::check_connectivity;
use mcbench_core::report::write_reports;
use mcbench_core::scorer::score_results;
use mcbench_core::stats::{add_confidence_intervals, pairwise_significance};
use mcbench_core::store::ArtifactStore;
use mcbench_core::types::RunStatus;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "mcbench",
    about = "Benchmark LLM providers against a shared multiple-choice question set"
)]
struct Cli {
    /// Path to the run configuration file.
    #[arg(short, long, default_value = "configs/run.yaml")]
    config: String,

    /// Path to the policy overlay file.
    #[arg(long, default_value = "configs/policy.yaml")]
    policy: String,

    /// Root directory for run artifacts.
    #[arg(long, default_value = "artifacts")]
    artifacts_root: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute (or resume) the evaluation run.
    Run {
        /// Cap the number of samples evaluated per provider.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Score a finished run and write Markdown/JSON reports.
    Report {
        /// Run ID; defaults to the one derived from the configuration.
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long, default_value = "reports")]
        reports_root: String,
    },

    /// Probe each configured provider with a one-token request.
    Check,

    /// Load and print the parsed configuration.
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    load_env_file(".env")?;

    let mut config = load_run_config(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config))?;
    let policy = merge_policy(&config.policy, &cli.policy)
        .with_context(|| format!("failed to merge policy from {}", cli.policy))?;
    config.policy = policy.clone();
    tracing::debug!(config = %cli.config, policy = %cli.policy, "configuration loaded");

    match cli.command {
        Command::Run { limit } => {
            if let Some(limit) = limit {
                config.benchmark.max_samples = Some(limit);
            }
            let engine = RunEngine::new(config, policy, &cli.artifacts_root);

            tokio::select! {
                summary = engine.run() => {
                    let summary = summary?;
                    match summary.status {
                        RunStatus::Completed => println!(
                            "Run {} completed: {} requests, {} errors",
                            summary.run_id, summary.total_requests, summary.total_errors
                        ),
                        RunStatus::StoppedDueToErrorRate => println!(
                            "Run {} stopped early due to provider error rate ({} requests, {} errors); rerun to resume",
                            summary.run_id, summary.total_requests, summary.total_errors
                        ),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("Interrupted; partial progress is persisted and the run can be resumed.");
                }
            }
        }

        Command::Report {
            run_id,
            reports_root,
        } => {
            let run_id = match run_id {
                Some(id) => id,
                None => build_run_manifest(&config, &config.policy)?.run_id,
            };
            let store = ArtifactStore::new(&cli.artifacts_root, &run_id)?;
            let summary = store
                .load_summary()?
                .with_context(|| format!("no summary found for run {run_id}; has it finished?"))?;
            let results = store.load_results()?;

            let mut scored = score_results(&results, &summary);
            add_confidence_intervals(&mut scored);
            let pairwise = pairwise_significance(&results);

            let paths = write_reports(&run_id, &scored, &pairwise, &reports_root)?;
            println!("Wrote {}", paths.markdown.display());
            println!("Wrote {}", paths.json.display());
        }

        Command::Check => {
            let results = check_connectivity(&config).await;
            let mut failures = 0;
            for result in &results {
                let status = if result.ok { "OK" } else { "FAIL" };
                println!("[{status}] {}: {}", result.system_id, result.detail);
                if !result.ok {
                    failures += 1;
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} provider(s) failed the connectivity check");
            }
        }

        Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
