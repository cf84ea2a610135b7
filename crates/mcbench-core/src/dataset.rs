//! Benchmark dataset loading.
//!
//! Datasets are newline-delimited JSON files of labeled multiple-choice
//! samples. Loading is strict: a missing file or a malformed line is fatal
//! before any provider call is made.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::config::BenchmarkSpec;
use crate::error::{McbenchError, Result};

fn default_category() -> String {
    "general".to_string()
}

/// One labeled multiple-choice question. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub sample_id: String,
    pub question: String,
    pub choices: Vec<String>,
    pub answer_index: usize,
    #[serde(default = "default_category")]
    pub category: String,
}

impl Sample {
    /// Render the prompt sent to providers, lettering choices from `A`.
    pub fn prompt(&self) -> String {
        let mut lines = Vec::with_capacity(self.choices.len() + 4);
        lines.push(format!("Category: {}", self.category));
        lines.push("Answer the following multiple-choice question.".to_string());
        lines.push(self.question.clone());
        for (i, choice) in self.choices.iter().enumerate() {
            lines.push(format!("{}. {}", option_letter(i), choice));
        }
        lines.push("Reply with only the option letter (A, B, C, D, ...).".to_string());
        lines.join("\n")
    }
}

/// Letter for a zero-based option index (`A` for 0).
pub fn option_letter(index: usize) -> char {
    char::from(b'A' + (index as u8))
}

/// An ordered, finite, restartable sequence of samples.
pub trait DatasetLoader: Send + Sync {
    fn load(&self) -> Result<Vec<Sample>>;
}

/// Loader for local JSONL files (the `mmlu_subset` format).
pub struct JsonlDataset {
    path: PathBuf,
    max_samples: Option<usize>,
}

impl JsonlDataset {
    pub fn new(path: impl Into<PathBuf>, max_samples: Option<usize>) -> Self {
        Self {
            path: path.into(),
            max_samples,
        }
    }
}

impl DatasetLoader for JsonlDataset {
    fn load(&self) -> Result<Vec<Sample>> {
        if !self.path.exists() {
            return Err(McbenchError::DatasetNotFound(self.path.clone()));
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut samples = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sample: Sample =
                serde_json::from_str(&line).map_err(|e| McbenchError::Dataset {
                    path: self.path.clone(),
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            samples.push(sample);
            if let Some(max) = self.max_samples {
                if samples.len() >= max {
                    break;
                }
            }
        }
        Ok(samples)
    }
}

/// Select a loader for a benchmark spec. Unknown benchmark names are rejected
/// at config validation, so this only maps known names.
pub fn get_dataset_loader(spec: &BenchmarkSpec) -> Result<Box<dyn DatasetLoader>> {
    match spec.name.as_str() {
        "mmlu_subset" => Ok(Box::new(JsonlDataset::new(
            &spec.dataset_path,
            spec.max_samples,
        ))),
        other => Err(McbenchError::Config(format!(
            "unknown benchmark '{other}'"
        ))),
    }
}
