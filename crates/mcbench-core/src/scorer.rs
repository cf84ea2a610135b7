//! Pure aggregation of raw result rows into per-system scores.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stats::ConfidenceInterval;
use crate::types::{ResultRecord, RunStatus, RunSummary};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryScore {
    pub attempted: u64,
    pub correct: u64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemScore {
    pub provider: String,
    pub model: String,
    pub attempted: u64,
    pub correct: u64,
    pub accuracy: f64,
    pub avg_latency_ms: f64,
    /// Pulled from the summary's per-system counters, not recomputed: failed
    /// attempts produce no result row, so the rows alone undercount errors.
    pub errors: u64,
    #[serde(default)]
    pub accuracy_ci95: Option<ConfidenceInterval>,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredMetrics {
    pub systems: BTreeMap<String, SystemScore>,
    pub total_rows: usize,
    pub status: RunStatus,
}

fn resolve_system_id(row: &ResultRecord) -> String {
    if row.system_id.is_empty() {
        format!("{}:{}", row.provider, row.model)
    } else {
        row.system_id.clone()
    }
}

/// Aggregate result rows into per-system accuracy, latency, and category
/// breakdowns. Accuracy is 0.0 for systems with nothing attempted.
pub fn score_results(results: &[ResultRecord], summary: &RunSummary) -> ScoredMetrics {
    let mut systems: BTreeMap<String, SystemScore> = BTreeMap::new();

    for row in results {
        let system_id = resolve_system_id(row);
        let score = systems.entry(system_id).or_default();
        score.provider = row.provider.clone();
        score.model = row.model.clone();
        score.attempted += 1;
        score.correct += row.is_correct as u64;
        score.avg_latency_ms += row.latency_ms as f64;

        let category = score.categories.entry(row.category.clone()).or_default();
        category.attempted += 1;
        category.correct += row.is_correct as u64;
    }

    for (system_id, score) in systems.iter_mut() {
        if score.attempted > 0 {
            score.accuracy = score.correct as f64 / score.attempted as f64;
            score.avg_latency_ms /= score.attempted as f64;
        }
        score.errors = summary
            .provider_metrics
            .get(system_id)
            .map(|m| m.errors)
            .unwrap_or(0);
        for category in score.categories.values_mut() {
            if category.attempted > 0 {
                category.accuracy = category.correct as f64 / category.attempted as f64;
            }
        }
    }

    ScoredMetrics {
        systems,
        total_rows: results.len(),
        status: summary.status,
    }
}
