//! Tests for Wilson intervals and pairwise significance.

use mcbench_core::stats::{pairwise_significance, wilson_interval};
use mcbench_core::types::ResultRecord;

fn row(system_id: &str, sample_id: &str, is_correct: bool) -> ResultRecord {
    let (provider, model) = system_id.split_once(':').unwrap();
    ResultRecord {
        run_id: "r".into(),
        system_id: system_id.into(),
        provider: provider.into(),
        model: model.into(),
        sample_id: sample_id.into(),
        category: "general".into(),
        request_fingerprint: format!("{system_id}-{sample_id}"),
        predicted: Some(if is_correct { "A" } else { "B" }.into()),
        expected: "A".into(),
        is_correct,
        latency_ms: 10,
        usage: None,
        response_text: String::new(),
    }
}

#[test]
fn wilson_bounds_stay_within_unit_interval() {
    for total in [0u64, 1, 2, 5, 20, 100] {
        for correct in 0..=total {
            let ci = wilson_interval(correct, total);
            assert!(
                0.0 <= ci.low && ci.low <= ci.high && ci.high <= 1.0,
                "violated for {correct}/{total}: {ci:?}"
            );
        }
    }
}

#[test]
fn wilson_interval_is_zero_width_for_no_attempts() {
    let ci = wilson_interval(0, 0);
    assert_eq!(ci.low, 0.0);
    assert_eq!(ci.high, 0.0);
}

#[test]
fn wilson_interval_excludes_zero_for_perfect_small_samples() {
    let ci = wilson_interval(2, 2);
    assert!(ci.low > 0.0);
    assert!(ci.high <= 1.0);
}

fn two_system_rows(a: &str, b: &str) -> Vec<ResultRecord> {
    // a correct on s1..s3; b correct on s1 only; both wrong on s4, s5.
    vec![
        row(a, "s1", true),
        row(a, "s2", true),
        row(a, "s3", true),
        row(a, "s4", false),
        row(a, "s5", false),
        row(b, "s1", true),
        row(b, "s2", false),
        row(b, "s3", false),
        row(b, "s4", false),
        row(b, "s5", false),
    ]
}

#[test]
fn pairwise_counts_wins_and_ties_over_matched_samples() {
    let comparisons = pairwise_significance(&two_system_rows("alpha:m", "beta:m"));
    assert_eq!(comparisons.len(), 1);
    let pair = &comparisons[0];
    assert_eq!(pair.system_a, "alpha:m");
    assert_eq!(pair.system_b, "beta:m");
    assert_eq!(pair.wins_a, 2);
    assert_eq!(pair.wins_b, 0);
    assert_eq!(pair.ties, 3);
    assert_eq!(pair.non_ties, 2);
    // k = 2 of n = 2 under p = 0.5: two-sided p = 0.5.
    assert!((pair.p_value_two_sided - 0.5).abs() < 1e-9);
}

#[test]
fn pairwise_is_symmetric_under_system_relabeling() {
    // Sorted order flips which side is "A" when the names swap.
    let forward = pairwise_significance(&two_system_rows("alpha:m", "beta:m"));
    let swapped = pairwise_significance(&two_system_rows("zeta:m", "beta:m"));

    let f = &forward[0];
    let s = &swapped[0];
    assert_eq!(s.system_a, "beta:m");
    assert_eq!(s.system_b, "zeta:m");
    assert_eq!(f.wins_a, s.wins_b);
    assert_eq!(f.wins_b, s.wins_a);
    assert_eq!(f.ties, s.ties);
    assert!((f.p_value_two_sided - s.p_value_two_sided).abs() < 1e-12);
}

#[test]
fn pairwise_ignores_unmatched_samples() {
    let mut rows = two_system_rows("alpha:m", "beta:m");
    // Only alpha attempted s6; it must not count anywhere.
    rows.push(row("alpha:m", "s6", true));
    let comparisons = pairwise_significance(&rows);
    let pair = &comparisons[0];
    assert_eq!(pair.wins_a + pair.wins_b + pair.ties, 5);
}

#[test]
fn pairwise_over_one_system_is_empty() {
    let rows = vec![row("alpha:m", "s1", true)];
    assert!(pairwise_significance(&rows).is_empty());
}
