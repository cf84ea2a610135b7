//! Statistical comparisons over scored results.
//!
//! Accuracy uncertainty uses the Wilson score interval, which stays inside
//! [0, 1] and behaves at small sample counts and extreme proportions where
//! the normal approximation does not. System-vs-system comparisons use a
//! matched-pairs sign test with an exact two-sided binomial p-value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::scorer::ScoredMetrics;
use crate::types::ResultRecord;

const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceInterval {
    pub low: f64,
    pub high: f64,
}

/// 95% Wilson score interval for a binomial proportion.
/// Returns `[0, 0]` when nothing was attempted.
pub fn wilson_interval(successes: u64, total: u64) -> ConfidenceInterval {
    if total == 0 {
        return ConfidenceInterval { low: 0.0, high: 0.0 };
    }
    let n = total as f64;
    let p = successes as f64 / n;
    let z = Z_95;
    let denom = 1.0 + z * z / n;
    let center = (p + z * z / (2.0 * n)) / denom;
    let margin = (z / denom) * ((p * (1.0 - p) / n) + (z * z / (4.0 * n * n))).sqrt();
    ConfidenceInterval {
        low: (center - margin).max(0.0),
        high: (center + margin).min(1.0),
    }
}

/// Enrich each system's score with its accuracy confidence interval.
pub fn add_confidence_intervals(scored: &mut ScoredMetrics) {
    for score in scored.systems.values_mut() {
        score.accuracy_ci95 = Some(wilson_interval(score.correct, score.attempted));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairwiseComparison {
    pub system_a: String,
    pub system_b: String,
    pub wins_a: u64,
    pub wins_b: u64,
    pub ties: u64,
    pub non_ties: u64,
    pub p_value_two_sided: f64,
}

/// Matched-pairs sign test for every unordered pair of systems.
///
/// Restricted to samples both systems attempted; a "win" is one system
/// correct where the other is wrong. The p-value is an exact two-sided
/// binomial test of the larger win count against a 0.5 null over non-ties.
/// Pairs are emitted in sorted system-id order.
pub fn pairwise_significance(results: &[ResultRecord]) -> Vec<PairwiseComparison> {
    // Last row wins per (system, sample); the result log is append-only.
    let mut by_system: BTreeMap<&str, BTreeMap<&str, bool>> = BTreeMap::new();
    for row in results {
        by_system
            .entry(row.system_id.as_str())
            .or_default()
            .insert(row.sample_id.as_str(), row.is_correct);
    }

    let systems: Vec<&str> = by_system.keys().copied().collect();
    let mut comparisons = Vec::new();
    for i in 0..systems.len() {
        for j in (i + 1)..systems.len() {
            let left = systems[i];
            let right = systems[j];
            let left_samples = &by_system[left];
            let right_samples = &by_system[right];

            let mut wins_a = 0u64;
            let mut wins_b = 0u64;
            let mut ties = 0u64;
            for (sample_id, &left_correct) in left_samples {
                let Some(&right_correct) = right_samples.get(sample_id) else {
                    continue;
                };
                if left_correct == right_correct {
                    ties += 1;
                } else if left_correct {
                    wins_a += 1;
                } else {
                    wins_b += 1;
                }
            }
            let non_ties = wins_a + wins_b;
            let p_value = binomial_two_sided_p_value(wins_a.max(wins_b), non_ties, 0.5);
            comparisons.push(PairwiseComparison {
                system_a: left.to_string(),
                system_b: right.to_string(),
                wins_a,
                wins_b,
                ties,
                non_ties,
                p_value_two_sided: p_value,
            });
        }
    }
    comparisons
}

/// Exact two-sided binomial test: sum of outcome probabilities no more
/// likely than the observed count.
fn binomial_two_sided_p_value(k: u64, n: u64, p: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let pmf = binomial_pmf(n, p);
    let observed = pmf[k as usize];
    let cumulative: f64 = pmf
        .iter()
        .filter(|&&prob| prob <= observed + 1e-15)
        .sum();
    cumulative.min(1.0)
}

/// Probability mass function for Binomial(n, p), computed iteratively:
/// pmf(i+1) = pmf(i) * (n - i) / (i + 1) * p / (1 - p).
fn binomial_pmf(n: u64, p: f64) -> Vec<f64> {
    let n_f = n as f64;
    let ratio = p / (1.0 - p);
    let mut pmf = Vec::with_capacity(n as usize + 1);
    let mut current = (1.0 - p).powf(n_f);
    pmf.push(current);
    for i in 0..n {
        current = current * ((n_f - i as f64) / (i as f64 + 1.0)) * ratio;
        pmf.push(current);
    }
    pmf
}
