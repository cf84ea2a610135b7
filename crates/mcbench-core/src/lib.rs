//! Core library for mcbench, a benchmark harness that compares LLM providers
//! on shared multiple-choice question sets.
//!
//! - [`config`]: Run configuration, validation, and the deterministic manifest
//! - [`policy`]: Budget/reliability/security policy and pure merging
//! - [`dataset`]: JSONL benchmark loading
//! - [`providers`]: The `generate` capability and its HTTP integrations
//! - [`cache`]: Content-addressed response cache
//! - [`store`]: Append-only run artifacts and resume tracking
//! - [`engine`]: The evaluation run engine
//! - [`scorer`]: Per-system accuracy/latency/category aggregation
//! - [`stats`]: Wilson intervals and pairwise significance tests
//! - [`report`]: Markdown/JSON report rendering
//! - [`error`]: Unified error types
//!
//! # Architecture
//!
//! The engine drives every configured provider across every sample, persisting
//! one result row per completed request. Because the run id is a hash of the
//! configuration and the result log doubles as the completed set, re-running
//! an identical configuration resumes instead of duplicating work. The scorer
//! and statistics layers only read finalized artifacts.

// Foundation modules (no internal dependencies)
pub mod error;
pub mod types;

// Configuration
pub mod config;
pub mod policy;

// Data loading
pub mod dataset;

// Provider capability
pub mod providers;

// Persistence
pub mod cache;
pub mod store;

// Execution
pub mod engine;

// Analysis
pub mod report;
pub mod scorer;
pub mod stats;

pub use config::{load_run_config, ProviderSpec, RunConfig};
pub use engine::{ExecutionSummary, RunEngine};
pub use error::{McbenchError, Result};
