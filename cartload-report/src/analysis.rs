//! Performance analysis of a load-test run
//!
//! Applies a fixed sequence of threshold rules to the harness results and the
//! CloudWatch aggregates. Each rule may record an issue, a recommendation and
//! a grade floor; the grade only ever gets worse.

use crate::config::AnalysisThresholds;
use crate::metrics::{AggregateStats, CloudWatchMetrics};
use crate::utils::{display_float, percentage, whole};
use crate::{TestRunOutput, DATABASE_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const CAPACITY_RECOMMENDATION: &str =
    "Consider increasing DynamoDB on-demand capacity or using provisioned capacity";

/// Overall run grade, ordered from best to worst
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[default]
    A,
    B,
    C,
}

impl Grade {
    /// Lower the grade to `floor` unless it is already worse
    pub fn downgrade(&mut self, floor: Grade) {
        *self = (*self).max(floor);
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        };
        f.write_str(letter)
    }
}

/// Success counts over the harness results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestStatistics {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage of successful operations, 0 when there were none
    pub success_rate: f64,
}

impl TestStatistics {
    pub fn from_output(output: &TestRunOutput) -> Self {
        let total = output.results.len();
        let successful = output.results.iter().filter(|r| r.success).count();
        Self {
            total,
            successful,
            failed: total - successful,
            success_rate: percentage(successful, total),
        }
    }
}

/// Findings of one analysis pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub performance_grade: Grade,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub summary: String,
}

impl AnalysisResult {
    /// Summary used when no issue was found
    pub fn excellent_summary() -> String {
        format!(
            "Excellent performance! All metrics within acceptable ranges for {}.",
            DATABASE_TYPE
        )
    }
}

/// Accumulates findings while the rules run
#[derive(Default)]
struct Findings {
    grade: Grade,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl Findings {
    fn issue(&mut self, issue: String) -> &mut Self {
        debug!("Issue: {}", issue);
        self.issues.push(issue);
        self
    }

    fn recommend(&mut self, recommendation: impl Into<String>) -> &mut Self {
        self.recommendations.push(recommendation.into());
        self
    }

    fn floor(&mut self, grade: Grade) -> &mut Self {
        self.grade.downgrade(grade);
        self
    }

    fn finish(self) -> AnalysisResult {
        let summary = if self.issues.is_empty() {
            AnalysisResult::excellent_summary()
        } else {
            format!("Found {} performance issues.", self.issues.len())
        };

        AnalysisResult {
            performance_grade: self.grade,
            issues: self.issues,
            recommendations: self.recommendations,
            summary,
        }
    }
}

fn above(stats: &Option<AggregateStats>, threshold: f64, pick: fn(&AggregateStats) -> f64) -> Option<f64> {
    stats.as_ref().map(pick).filter(|value| *value > threshold)
}

/// Grade a run against the configured thresholds
pub fn analyze(
    output: &TestRunOutput,
    metrics: &CloudWatchMetrics,
    thresholds: &AnalysisThresholds,
) -> AnalysisResult {
    let mut findings = Findings::default();

    let stats = TestStatistics::from_output(output);
    if stats.success_rate < thresholds.required_success_rate {
        findings
            .issue(format!(
                "Test failures detected: {} operations failed",
                stats.failed
            ))
            .floor(Grade::B);
    }

    if let Some(errors) = above(&metrics.products_table.user_errors, 0.0, |s| s.max) {
        findings
            .issue(format!(
                "Products table throttling detected: {} errors",
                whole(errors)
            ))
            .recommend(CAPACITY_RECOMMENDATION)
            .floor(Grade::C);
    }

    if let Some(errors) = above(&metrics.carts_table.user_errors, 0.0, |s| s.max) {
        findings
            .issue(format!(
                "Carts table throttling detected: {} errors",
                whole(errors)
            ))
            .recommend(CAPACITY_RECOMMENDATION)
            .floor(Grade::C);
    }

    if let Some(cpu) = above(&metrics.ecs.cpu, thresholds.max_cpu_percent, |s| s.avg) {
        findings
            .issue(format!("High ECS CPU utilization: {}%", display_float(cpu)))
            .recommend("Consider scaling ECS tasks or increasing CPU allocation")
            .floor(Grade::B);
    }

    for (operation, op_stats) in output.operation_stats() {
        if op_stats.avg_response_time > thresholds.max_operation_latency_ms {
            findings
                .issue(format!(
                    "Slow {} operations: {:.2}ms avg",
                    operation, op_stats.avg_response_time
                ))
                .recommend(format!(
                    "Investigate {} performance - {} should be faster",
                    operation, DATABASE_TYPE
                ))
                .floor(Grade::B);
        }
    }

    let latency = thresholds.max_table_latency_ms;

    if let Some(avg) = above(&metrics.products_table.getitem_latency, latency, |s| s.avg) {
        findings
            .issue(format!("High products table latency: {}ms", display_float(avg)))
            .recommend("Review DynamoDB query patterns and consider using DAX for caching");
    }

    if let Some(avg) = above(&metrics.carts_table.putitem_latency, latency, |s| s.avg) {
        findings
            .issue(format!("High carts write latency: {}ms", display_float(avg)))
            .recommend("Review data model and consider batching write operations");
    }

    if let Some(avg) = above(&metrics.carts_table.getitem_latency, latency, |s| s.avg) {
        findings
            .issue(format!("High carts read latency: {}ms", display_float(avg)))
            .recommend("Consider using DynamoDB DAX for read caching");
    }

    findings.finish()
}
