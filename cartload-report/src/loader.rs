//! Loading of harness results and CloudWatch metric snapshots
//!
//! The results file is required; metric snapshots are best-effort. Every
//! snapshot file matched by a pattern yields a [`FileOutcome`] so callers can
//! see what was skipped and why.

use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::metrics::MetricDatapoint;
use crate::TestRunOutput;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Read the harness results file named by the configuration
pub fn load_test_results(config: &ReportConfig) -> Result<TestRunOutput> {
    read_test_results(&config.results_path)
}

/// Read and parse a harness results file
pub fn read_test_results(path: &Path) -> Result<TestRunOutput> {
    if !path.exists() {
        return Err(ReportError::ResultsNotFound(path.to_path_buf()));
    }

    let invalid = |reason: String| ReportError::InvalidResults {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let output: TestRunOutput =
        serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
    info!(
        "Loaded {} test results from {}",
        output.results.len(),
        path.display()
    );
    Ok(output)
}

/// What happened to one matched snapshot file
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Loaded { datapoints: usize },
    Skipped { reason: String },
}

/// Per-file outcome of a metric family scan
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Combined datapoints of every snapshot file matching one pattern
#[derive(Debug, Clone, Default)]
pub struct MetricFamily {
    pub pattern: String,
    pub datapoints: Vec<MetricDatapoint>,
    pub outcomes: Vec<FileOutcome>,
}

impl MetricFamily {
    /// Number of matched files that contributed datapoints
    pub fn loaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::Loaded { .. }))
            .count()
    }

    /// Number of matched files that were skipped
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.loaded()
    }
}

#[derive(Deserialize)]
struct MetricSnapshot {
    #[serde(rename = "Datapoints")]
    datapoints: Option<Vec<MetricDatapoint>>,
}

/// Load every snapshot file in the metrics directory matching `pattern`.
///
/// Files are read in lexicographic order. Unreadable or malformed files are
/// skipped and recorded in [`MetricFamily::outcomes`].
pub fn load_metric_family(config: &ReportConfig, pattern: &str) -> MetricFamily {
    let mut family = MetricFamily {
        pattern: pattern.to_string(),
        ..Default::default()
    };

    let paths = match matching_files(&config.metrics_dir, pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("{}", e);
            return family;
        }
    };

    for path in paths {
        let status = match read_snapshot(&path) {
            Ok(datapoints) => {
                let status = FileStatus::Loaded {
                    datapoints: datapoints.len(),
                };
                family.datapoints.extend(datapoints);
                status
            }
            Err(reason) => FileStatus::Skipped { reason },
        };

        match &status {
            FileStatus::Loaded { datapoints } => {
                debug!("Loaded {} datapoints from {}", datapoints, path.display())
            }
            FileStatus::Skipped { reason } => {
                debug!("Skipping {}: {}", path.display(), reason)
            }
        }

        family.outcomes.push(FileOutcome { path, status });
    }

    family
}

/// Resolve `pattern` inside `dir`, sorted lexicographically
fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
    let full_pattern = Path::new(&escaped_dir).join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let entries = glob::glob(&full_pattern).map_err(|e| ReportError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Unreadable path while matching {}: {}", pattern, e);
                None
            }
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn read_snapshot(path: &Path) -> std::result::Result<Vec<MetricDatapoint>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let snapshot: MetricSnapshot = serde_json::from_str(&content).map_err(|e| e.to_string())?;
    snapshot
        .datapoints
        .ok_or_else(|| "no Datapoints list".to_string())
}
