//! Report assembly and output
//!
//! Builds the [`Report`] for a run, writes it as indented JSON, and renders
//! the console summary printed after each run.

use crate::analysis::{analyze, AnalysisResult, TestStatistics};
use crate::config::ReportConfig;
use crate::error::Result;
use crate::loader::load_test_results;
use crate::metrics::{collect_cloudwatch_metrics, AggregateStats, CloudWatchMetrics};
use crate::utils::{rule, whole};
use crate::{TestRunOutput, DATABASE_TYPE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

const REPORT_WIDTH: usize = 70;

/// Harness metadata and statistics carried into the report verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultsSection {
    pub metadata: serde_json::Value,
    pub statistics: serde_json::Value,
}

/// Complete report for one load-test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_generated: String,
    pub database_type: String,
    pub test_results: TestResultsSection,
    pub cloudwatch_metrics: CloudWatchMetrics,
    pub analysis: AnalysisResult,
}

/// Assemble a report stamped with the current UTC time
pub fn build_report(
    output: &TestRunOutput,
    metrics: CloudWatchMetrics,
    analysis: AnalysisResult,
) -> Report {
    build_report_at(Utc::now(), output, metrics, analysis)
}

fn build_report_at(
    generated: DateTime<Utc>,
    output: &TestRunOutput,
    metrics: CloudWatchMetrics,
    analysis: AnalysisResult,
) -> Report {
    Report {
        report_generated: generated.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        database_type: DATABASE_TYPE.to_string(),
        test_results: TestResultsSection {
            metadata: output.test_metadata.clone(),
            statistics: output.statistics.clone(),
        },
        cloudwatch_metrics: metrics,
        analysis,
    }
}

/// Write the report as 2-space indented JSON
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    info!("Report written to {}", path.display());
    Ok(())
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n", title));
    out.push_str(&format!("{}\n", rule('-', REPORT_WIDTH)));
}

fn capacity_line(out: &mut String, label: &str, stats: &Option<AggregateStats>) {
    if let Some(s) = stats {
        out.push_str(&format!(
            "{:<21}{:6.2} units (total: {:6.2})\n",
            label, s.avg, s.max
        ));
    }
}

fn latency_line(out: &mut String, label: &str, unit: &str, stats: &Option<AggregateStats>) {
    if let Some(s) = stats {
        out.push_str(&format!(
            "{:<21}{:6.2}{} (max: {:6.2}{})\n",
            label, s.avg, unit, s.max, unit
        ));
    }
}

fn count_line(out: &mut String, label: &str, stats: &Option<AggregateStats>) {
    if let Some(s) = stats {
        out.push_str(&format!("{:<21}{}\n", label, whole(s.max)));
    }
}

fn numbered(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{}\n", heading));
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, item));
    }
}

/// Render the human-readable console summary
pub fn render_summary(report: &Report, output: &TestRunOutput, config: &ReportConfig) -> String {
    let mut out = String::new();
    let heavy = rule('=', REPORT_WIDTH);

    out.push_str(&format!("\n{}\n", heavy));
    out.push_str(&format!(
        "COMPREHENSIVE {} TEST REPORT\n",
        report.database_type.to_uppercase()
    ));
    out.push_str(&format!("{}\n", heavy));

    let stats = TestStatistics::from_output(output);
    section(&mut out, "📊 TEST RESULTS:");
    out.push_str(&format!("Total Operations:     {}\n", stats.total));
    out.push_str(&format!("Successful:           {}\n", stats.successful));
    out.push_str(&format!("Failed:               {}\n", stats.failed));
    out.push_str(&format!("Success Rate:         {:.2}%\n", stats.success_rate));

    section(&mut out, "⏱️  RESPONSE TIMES:");
    for (operation, op) in output.response_time_stats() {
        out.push_str(&format!(
            "{:<20} avg: {:6.2}ms  (min: {:6.2}ms, max: {:6.2}ms)\n",
            operation, op.avg_response_time, op.min_response_time, op.max_response_time
        ));
    }

    let metrics = &report.cloudwatch_metrics;

    let products = &metrics.products_table;
    section(&mut out, "📦 PRODUCTS TABLE METRICS:");
    capacity_line(&mut out, "Read Capacity Used:", &products.read_capacity);
    capacity_line(&mut out, "Write Capacity Used:", &products.write_capacity);
    latency_line(&mut out, "GetItem Latency:", "ms", &products.getitem_latency);
    count_line(&mut out, "Throttle Errors:", &products.user_errors);

    let carts = &metrics.carts_table;
    section(&mut out, "🛒 CARTS TABLE METRICS:");
    capacity_line(&mut out, "Read Capacity Used:", &carts.read_capacity);
    capacity_line(&mut out, "Write Capacity Used:", &carts.write_capacity);
    latency_line(&mut out, "PutItem Latency:", "ms", &carts.putitem_latency);
    latency_line(&mut out, "GetItem Latency:", "ms", &carts.getitem_latency);
    count_line(&mut out, "Throttle Errors:", &carts.user_errors);

    section(&mut out, "🚀 ECS METRICS:");
    latency_line(&mut out, "CPU Utilization:", "%", &metrics.ecs.cpu);
    latency_line(&mut out, "Memory Utilization:", "%", &metrics.ecs.memory);

    let alb = &metrics.alb;
    section(&mut out, "⚖️  ALB METRICS:");
    latency_line(&mut out, "Response Time:", "s", &alb.response_time);
    count_line(&mut out, "Total Requests:", &alb.request_count);
    if let Some(hosts) = &alb.healthy_hosts {
        out.push_str(&format!("Healthy Hosts (avg): {:6.2}\n", hosts.avg));
    }

    let analysis = &report.analysis;
    section(&mut out, "📈 PERFORMANCE ANALYSIS:");
    out.push_str(&format!("Grade: {}\n", analysis.performance_grade));
    out.push_str(&format!("\n{}\n", analysis.summary));
    numbered(&mut out, "⚠️  Issues Found:", &analysis.issues);
    numbered(&mut out, "💡 Recommendations:", &analysis.recommendations);

    let output_path = config.output_path.display();
    out.push_str(&format!("\n{}\n", heavy));
    out.push_str(&format!("Report saved to: {}\n", output_path));
    out.push_str(&format!("{}\n", heavy));
    out.push_str("\nTo compare with MySQL:\n");
    out.push_str(&format!(
        "  cat {} | jq '.performance_grade'\n",
        output_path
    ));
    out.push_str(&format!(
        "  cat {} | jq '.performance_grade'\n",
        config.comparison_report_path.display()
    ));
    out.push_str(&format!("{}\n", heavy));

    out
}

/// Run the report generator the way the command line does.
///
/// A missing or unparsable results file prints `Error: ...` and yields
/// `Ok(None)` with nothing written; the run still counts as successful.
/// Any other failure, such as an unwritable output path, is returned.
pub fn run(config: &ReportConfig) -> Result<Option<Report>> {
    match generate_report(config) {
        Ok(report) => Ok(Some(report)),
        Err(e) if e.is_missing_results() => {
            println!("Error: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Run the whole pipeline: load, aggregate, analyze, write and print.
///
/// Fails without writing anything when the results file is missing or
/// unparsable. Missing metric files only leave their aggregates empty.
pub fn generate_report(config: &ReportConfig) -> Result<Report> {
    let output = load_test_results(config)?;
    let metrics = collect_cloudwatch_metrics(config);
    let analysis = analyze(&output, &metrics, &config.thresholds);
    info!(
        "Analysis complete: grade {} with {} issues",
        analysis.performance_grade,
        analysis.issues.len()
    );

    let report = build_report(&output, metrics, analysis);
    write_report(&report, &config.output_path)?;

    print!("{}", render_summary(&report, &output, config));

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Grade;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_output() -> TestRunOutput {
        serde_json::from_value(json!({
            "test_metadata": {"workers": 10},
            "statistics": {
                "create_cart": {"count": 2, "avg_response_time": 45.678, "min_response_time": 30.0, "max_response_time": 61.356}
            },
            "results": [
                {"operation": "create_cart", "success": true},
                {"operation": "create_cart", "success": false}
            ]
        }))
        .unwrap()
    }

    fn sample_report(output: &TestRunOutput) -> Report {
        let mut metrics = CloudWatchMetrics::default();
        metrics.products_table.user_errors = Some(AggregateStats {
            min: 0.0,
            max: 3.0,
            avg: 1.5,
            count: 2,
        });
        metrics.ecs.cpu = Some(AggregateStats {
            min: 10.0,
            max: 55.5,
            avg: 32.25,
            count: 4,
        });
        let analysis = analyze(output, &metrics, &Default::default());
        let generated = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        build_report_at(generated, output, metrics, analysis)
    }

    #[test]
    fn test_build_report() {
        let output = sample_output();
        let report = sample_report(&output);

        assert_eq!(report.report_generated, "2024-03-09T14:05:07Z");
        assert_eq!(report.database_type, "DynamoDB");
        assert_eq!(report.test_results.metadata, json!({"workers": 10}));
        assert_eq!(report.analysis.performance_grade, Grade::C);
    }

    #[test]
    fn test_report_json_shape() {
        let output = sample_output();
        let value = serde_json::to_value(sample_report(&output)).unwrap();

        assert_eq!(value["cloudwatch_metrics"]["products_table"]["user_errors"]["max"], json!(3.0));
        assert_eq!(value["cloudwatch_metrics"]["alb"]["response_time"], json!(null));
        assert_eq!(value["analysis"]["performance_grade"], json!("C"));
        assert_eq!(
            value["test_results"]["statistics"]["create_cart"]["count"],
            json!(2)
        );
    }

    #[test]
    fn test_write_report_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let output = sample_output();
        let report = sample_report(&output);

        write_report(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n  \"report_generated\""));
        let reparsed: Report = serde_json::from_str(&content).unwrap();
        assert_eq!(reparsed, report);
    }

    #[test]
    fn test_render_summary() {
        let output = sample_output();
        let report = sample_report(&output);
        let config = ReportConfig::default();

        let text = render_summary(&report, &output, &config);

        assert!(text.contains("COMPREHENSIVE DYNAMODB TEST REPORT"));
        assert!(text.contains("Total Operations:     2\n"));
        assert!(text.contains("Failed:               1\n"));
        assert!(text.contains("Success Rate:         50.00%\n"));
        assert!(text.contains(
            "create_cart          avg:  45.68ms  (min:  30.00ms, max:  61.36ms)\n"
        ));
        assert!(text.contains("Throttle Errors:     3\n"));
        assert!(text.contains("CPU Utilization:      32.25% (max:  55.50%)\n"));
        assert!(!text.contains("Memory Utilization:"));
        assert!(text.contains("Grade: C\n"));
        assert!(text.contains("  1. Test failures detected: 1 operations failed\n"));
        assert!(text.contains("  2. Products table throttling detected: 3 errors\n"));
        assert!(text.contains("Report saved to: comprehensive_dynamodb_report.json\n"));
        assert!(text.contains("  cat comprehensive_report.json | jq '.performance_grade'\n"));
    }

    #[test]
    fn test_response_times_list_top_level_entries() {
        let output: TestRunOutput = serde_json::from_value(json!({
            "statistics": {
                "operations": {
                    "checkout": {"avg_response_time": 900.0, "min_response_time": 700.0, "max_response_time": 1200.0}
                },
                "get_cart": {"avg_response_time": 12.5, "min_response_time": 3.0, "max_response_time": 40.0}
            },
            "results": [{"success": true}]
        }))
        .unwrap();
        let analysis = analyze(&output, &CloudWatchMetrics::default(), &Default::default());
        assert_eq!(analysis.issues, vec!["Slow checkout operations: 900.00ms avg"]);
        let report = build_report(&output, CloudWatchMetrics::default(), analysis);

        let text = render_summary(&report, &output, &ReportConfig::default());
        assert!(text.contains(
            "get_cart             avg:  12.50ms  (min:   3.00ms, max:  40.00ms)\n"
        ));
        assert!(!text.contains("checkout             avg:"));
        assert!(!text.contains("operations           avg:"));
    }

    #[test]
    fn test_render_summary_without_issues() {
        let output: TestRunOutput =
            serde_json::from_value(json!({"results": [{"success": true}]})).unwrap();
        let analysis = analyze(&output, &CloudWatchMetrics::default(), &Default::default());
        let report = build_report(&output, CloudWatchMetrics::default(), analysis);

        let text = render_summary(&report, &output, &ReportConfig::default());
        assert!(text.contains("Grade: A\n"));
        assert!(text.contains(&AnalysisResult::excellent_summary()));
        assert!(!text.contains("Issues Found"));
        assert!(!text.contains("Recommendations"));
    }
}
