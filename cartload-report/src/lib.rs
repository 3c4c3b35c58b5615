//! Cartload Load-Test Reporting
//!
//! This crate turns the output of a Cartload load-test run into a graded report.
//! It includes:
//! - Loading of harness results and CloudWatch metric snapshots
//! - Aggregation of metric datapoints into min/max/avg/count summaries
//! - Threshold analysis producing issues, recommendations and a letter grade
//! - JSON report output and a console summary

pub mod analysis;
pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod report;
pub mod utils;

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

pub use error::{ReportError, Result};

/// Database backend label stamped on every report
pub const DATABASE_TYPE: &str = "DynamoDB";

/// Result of a single operation issued by the load-testing harness.
///
/// Only `success` is interpreted; a missing or non-boolean flag counts as a
/// failure. Every other field (operation, response_time, status_code, ...) is
/// kept untyped in `fields` so harness variations never reject the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestRunResult {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl TestRunResult {
    /// Operation name, when the harness recorded one as a string
    pub fn operation(&self) -> Option<&str> {
        self.fields.get("operation").and_then(|v| v.as_str())
    }

    /// Response time in milliseconds, when recorded as a number
    pub fn response_time(&self) -> Option<f64> {
        self.fields.get("response_time").and_then(|v| v.as_f64())
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}

/// Complete output file written by the load-testing harness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunOutput {
    #[serde(default = "empty_object")]
    pub test_metadata: serde_json::Value,
    /// Per-operation statistics, kept verbatim for the report
    #[serde(default = "empty_object")]
    pub statistics: serde_json::Value,
    #[serde(default)]
    pub results: Vec<TestRunResult>,
}

impl Default for TestRunOutput {
    fn default() -> Self {
        Self {
            test_metadata: empty_object(),
            statistics: empty_object(),
            results: Vec::new(),
        }
    }
}

impl TestRunOutput {
    /// Per-operation statistics used to find slow operations.
    ///
    /// Reads the nested `operations` object when present, otherwise every
    /// top-level entry that carries an `avg_response_time`. Entries come back
    /// in key order.
    pub fn operation_stats(&self) -> Vec<(String, OperationStats)> {
        match self.statistics.get("operations") {
            Some(serde_json::Value::Object(ops)) => stats_entries(ops),
            _ => self.response_time_stats(),
        }
    }

    /// Top-level statistics entries that carry an `avg_response_time`, as
    /// listed in the console RESPONSE TIMES section. The nested `operations`
    /// object is never one of them.
    pub fn response_time_stats(&self) -> Vec<(String, OperationStats)> {
        match self.statistics.as_object() {
            Some(stats) => stats_entries(stats)
                .into_iter()
                .filter(|(name, _)| name != "operations")
                .collect(),
            None => Vec::new(),
        }
    }
}

fn stats_entries(
    source: &serde_json::Map<String, serde_json::Value>,
) -> Vec<(String, OperationStats)> {
    source
        .iter()
        .filter(|(_, value)| value.get("avg_response_time").is_some())
        .filter_map(|(name, value)| {
            serde_json::from_value::<OperationStats>(value.clone())
                .ok()
                .map(|stats| (name.clone(), stats))
        })
        .collect()
}

/// Statistics the harness computed for one operation type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    #[serde(default)]
    pub avg_response_time: f64,
    #[serde(default)]
    pub min_response_time: f64,
    #[serde(default)]
    pub max_response_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_response_time: Option<f64>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
