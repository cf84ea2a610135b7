//! Report rendering: Markdown and JSON views of scored results.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::scorer::{ScoredMetrics, SystemScore};
use crate::stats::PairwiseComparison;

/// Systems sorted by accuracy, best first.
fn leaderboard(scored: &ScoredMetrics) -> Vec<(&String, &SystemScore)> {
    let mut rows: Vec<_> = scored.systems.iter().collect();
    rows.sort_by(|a, b| {
        b.1.accuracy
            .partial_cmp(&a.1.accuracy)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

pub fn build_markdown_report(
    run_id: &str,
    scored: &ScoredMetrics,
    pairwise: &[PairwiseComparison],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Evaluation Report: {run_id}\n");
    let _ = writeln!(out, "- Status: `{}`", serde_json::to_value(scored.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default());
    let _ = writeln!(out, "- Total evaluated rows: `{}`\n", scored.total_rows);

    let _ = writeln!(out, "## Leaderboard\n");
    let _ = writeln!(
        out,
        "| System | Attempted | Correct | Accuracy | CI95 | Avg Latency (ms) | Errors |"
    );
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|---:|");
    for (system_id, score) in leaderboard(scored) {
        let (low, high) = score
            .accuracy_ci95
            .map(|ci| (ci.low, ci.high))
            .unwrap_or((0.0, 0.0));
        let _ = writeln!(
            out,
            "| {system_id} | {} | {} | {:.3} | [{low:.3}, {high:.3}] | {:.1} | {} |",
            score.attempted, score.correct, score.accuracy, score.avg_latency_ms, score.errors
        );
    }

    let _ = writeln!(out, "\n## Pairwise Significance (Matched Samples)\n");
    if pairwise.is_empty() {
        let _ = writeln!(out, "No system pairs available.");
    } else {
        let _ = writeln!(out, "| System A | System B | Wins A | Wins B | Ties | p-value |");
        let _ = writeln!(out, "|---|---|---:|---:|---:|---:|");
        for row in pairwise {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {:.4} |",
                row.system_a, row.system_b, row.wins_a, row.wins_b, row.ties,
                row.p_value_two_sided
            );
        }
    }

    let _ = writeln!(out, "\n## Category Breakdown\n");
    for (system_id, score) in leaderboard(scored) {
        let _ = writeln!(out, "### {system_id}\n");
        let _ = writeln!(out, "| Category | Attempted | Correct | Accuracy |");
        let _ = writeln!(out, "|---|---:|---:|---:|");
        for (name, cat) in &score.categories {
            let _ = writeln!(
                out,
                "| {name} | {} | {} | {:.3} |",
                cat.attempted, cat.correct, cat.accuracy
            );
        }
        let _ = writeln!(out);
    }

    out.trim_end().to_string() + "\n"
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

/// Write Markdown and JSON reports for a run under `reports_root`.
pub fn write_reports(
    run_id: &str,
    scored: &ScoredMetrics,
    pairwise: &[PairwiseComparison],
    reports_root: impl AsRef<Path>,
) -> Result<ReportPaths> {
    let root = reports_root.as_ref();
    fs::create_dir_all(root)?;

    let markdown = root.join(format!("{run_id}.md"));
    fs::write(&markdown, build_markdown_report(run_id, scored, pairwise))?;

    let json = root.join(format!("{run_id}.json"));
    let payload = serde_json::json!({
        "run_id": run_id,
        "scored": scored,
        "pairwise": pairwise,
    });
    fs::write(&json, serde_json::to_string_pretty(&payload)?)?;

    Ok(ReportPaths { markdown, json })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{CategoryScore, SystemScore};
    use crate::types::RunStatus;
    use std::collections::BTreeMap;

    fn scored() -> ScoredMetrics {
        let mut categories = BTreeMap::new();
        categories.insert(
            "math".to_string(),
            CategoryScore {
                attempted: 2,
                correct: 1,
                accuracy: 0.5,
            },
        );
        let mut systems = BTreeMap::new();
        systems.insert(
            "openai:m".to_string(),
            SystemScore {
                provider: "openai".into(),
                model: "m".into(),
                attempted: 2,
                correct: 1,
                accuracy: 0.5,
                avg_latency_ms: 120.0,
                errors: 1,
                accuracy_ci95: None,
                categories,
            },
        );
        ScoredMetrics {
            systems,
            total_rows: 2,
            status: RunStatus::Completed,
        }
    }

    #[test]
    fn markdown_contains_leaderboard_and_categories() {
        let md = build_markdown_report("abc123", &scored(), &[]);
        assert!(md.starts_with("# Evaluation Report: abc123"));
        assert!(md.contains("Status: `completed`"));
        assert!(md.contains("| openai:m | 2 | 1 | 0.500 |"));
        assert!(md.contains("No system pairs available."));
        assert!(md.contains("| math | 2 | 1 | 0.500 |"));
    }

    #[test]
    fn writes_both_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_reports("abc123", &scored(), &[], dir.path()).unwrap();
        assert!(paths.markdown.exists());
        assert!(paths.json.exists());
    }
}
