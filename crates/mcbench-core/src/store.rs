//! Durable run artifacts: manifest, result/error logs, and summary.
//!
//! Layout under the artifacts root:
//!
//! ```text
//! runs/<run_id>/manifest.json   write-once
//! runs/<run_id>/results.jsonl   append-only
//! runs/<run_id>/errors.jsonl    append-only
//! runs/<run_id>/summary.json    overwritten at termination
//! runs/<run_id>/cache/          response cache (see crate::cache)
//! ```
//!
//! Resumability is reconstructed from the result log: the fingerprints it
//! contains are the completed set.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::RunManifest;
use crate::error::Result;
use crate::types::{ErrorRecord, ResultRecord, RunSummary};

#[derive(Debug)]
pub struct ArtifactStore {
    run_dir: PathBuf,
    manifest_path: PathBuf,
    results_path: PathBuf,
    errors_path: PathBuf,
    summary_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(artifacts_root: impl AsRef<Path>, run_id: &str) -> Result<Self> {
        let run_dir = artifacts_root.as_ref().join("runs").join(run_id);
        fs::create_dir_all(&run_dir)?;
        Ok(Self {
            manifest_path: run_dir.join("manifest.json"),
            results_path: run_dir.join("results.jsonl"),
            errors_path: run_dir.join("errors.jsonl"),
            summary_path: run_dir.join("summary.json"),
            run_dir,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Write the manifest unless one already exists (resumed run).
    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<()> {
        if self.manifest_path.exists() {
            return Ok(());
        }
        fs::write(&self.manifest_path, serde_json::to_string_pretty(manifest)?)?;
        Ok(())
    }

    pub fn append_result(&self, record: &ResultRecord) -> Result<()> {
        append_jsonl(&self.results_path, &serde_json::to_string(record)?)
    }

    pub fn append_error(&self, record: &ErrorRecord) -> Result<()> {
        append_jsonl(&self.errors_path, &serde_json::to_string(record)?)
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        fs::write(&self.summary_path, serde_json::to_string_pretty(summary)?)?;
        Ok(())
    }

    /// Fingerprints of every completed request, scanned from the result log.
    ///
    /// Blank and unparseable lines (e.g. a partially written trailing line
    /// from an interrupted run) are skipped rather than failing the load.
    pub fn load_completed_fingerprints(&self) -> Result<HashSet<String>> {
        let mut keys = HashSet::new();
        if !self.results_path.exists() {
            return Ok(keys);
        }
        let file = File::open(&self.results_path)?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ResultRecord>(&line) {
                Ok(record) => {
                    keys.insert(record.request_fingerprint);
                }
                Err(e) => {
                    debug!(error = %e, "skipping unparseable result line");
                }
            }
        }
        Ok(keys)
    }

    pub fn load_results(&self) -> Result<Vec<ResultRecord>> {
        let mut rows = Vec::new();
        if !self.results_path.exists() {
            return Ok(rows);
        }
        let file = File::open(&self.results_path)?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ResultRecord>(&line) {
                Ok(record) => rows.push(record),
                Err(e) => debug!(error = %e, "skipping unparseable result line"),
            }
        }
        Ok(rows)
    }

    pub fn load_errors(&self) -> Result<Vec<ErrorRecord>> {
        let mut rows = Vec::new();
        if !self.errors_path.exists() {
            return Ok(rows);
        }
        let file = File::open(&self.errors_path)?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ErrorRecord>(&line) {
                Ok(record) => rows.push(record),
                Err(e) => debug!(error = %e, "skipping unparseable error line"),
            }
        }
        Ok(rows)
    }

    pub fn load_summary(&self) -> Result<Option<RunSummary>> {
        if !self.summary_path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.summary_path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

fn append_jsonl(path: &Path, line: &str) -> Result<()> {
    let mut file = File::options().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}
