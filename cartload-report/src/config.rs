//! Configuration management for report generation

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Statistic field read from datapoints when none is configured
pub const DEFAULT_STATISTIC: &str = "Average";

/// Environment variable overriding [`ReportConfig::results_path`]
pub const ENV_RESULTS_PATH: &str = "CARTLOAD_RESULTS_PATH";
/// Environment variable overriding [`ReportConfig::metrics_dir`]
pub const ENV_METRICS_DIR: &str = "CARTLOAD_METRICS_DIR";
/// Environment variable overriding [`ReportConfig::output_path`]
pub const ENV_OUTPUT_PATH: &str = "CARTLOAD_OUTPUT_PATH";

/// One family of metric snapshot files and the statistic to aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSource {
    /// Glob pattern relative to the metrics directory
    pub pattern: String,
    /// Datapoint field to aggregate (e.g. "Average", "Sum")
    #[serde(default = "default_statistic")]
    pub statistic: String,
}

impl MetricSource {
    pub fn new(pattern: impl Into<String>, statistic: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            statistic: statistic.into(),
        }
    }

    fn average(pattern: &str) -> Self {
        Self::new(pattern, DEFAULT_STATISTIC)
    }

    fn sum(pattern: &str) -> Self {
        Self::new(pattern, "Sum")
    }
}

fn default_statistic() -> String {
    DEFAULT_STATISTIC.to_string()
}

/// Metric sources for the products table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductsTableSources {
    pub read_capacity: MetricSource,
    pub write_capacity: MetricSource,
    pub getitem_latency: MetricSource,
    pub user_errors: MetricSource,
}

impl Default for ProductsTableSources {
    fn default() -> Self {
        Self {
            read_capacity: MetricSource::sum("products_read_capacity_*.json"),
            write_capacity: MetricSource::sum("products_write_capacity_*.json"),
            getitem_latency: MetricSource::average("products_getitem_latency_*.json"),
            user_errors: MetricSource::sum("products_user_errors_*.json"),
        }
    }
}

/// Metric sources for the carts table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartsTableSources {
    pub read_capacity: MetricSource,
    pub write_capacity: MetricSource,
    pub putitem_latency: MetricSource,
    pub getitem_latency: MetricSource,
    pub user_errors: MetricSource,
}

impl Default for CartsTableSources {
    fn default() -> Self {
        Self {
            read_capacity: MetricSource::sum("carts_read_capacity_*.json"),
            write_capacity: MetricSource::sum("carts_write_capacity_*.json"),
            putitem_latency: MetricSource::average("carts_putitem_latency_*.json"),
            getitem_latency: MetricSource::average("carts_getitem_latency_*.json"),
            user_errors: MetricSource::sum("carts_user_errors_*.json"),
        }
    }
}

/// Metric sources for the ECS service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsSources {
    pub cpu: MetricSource,
    pub memory: MetricSource,
}

impl Default for EcsSources {
    fn default() -> Self {
        Self {
            cpu: MetricSource::average("ecs_cpu_*.json"),
            memory: MetricSource::average("ecs_memory_*.json"),
        }
    }
}

/// Metric sources for the application load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbSources {
    pub response_time: MetricSource,
    pub request_count: MetricSource,
    pub healthy_hosts: MetricSource,
}

impl Default for AlbSources {
    fn default() -> Self {
        Self {
            response_time: MetricSource::average("alb_response_time_*.json"),
            request_count: MetricSource::sum("alb_request_count_*.json"),
            healthy_hosts: MetricSource::average("alb_healthy_hosts_*.json"),
        }
    }
}

/// All metric families collected for a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSources {
    pub products_table: ProductsTableSources,
    pub carts_table: CartsTableSources,
    pub ecs: EcsSources,
    pub alb: AlbSources,
}

/// Thresholds used by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisThresholds {
    /// Success rate (percent) below which test failures are reported
    pub required_success_rate: f64,
    /// Average ECS CPU utilization (percent) considered high
    pub max_cpu_percent: f64,
    /// Average per-operation response time (ms) considered slow
    pub max_operation_latency_ms: f64,
    /// Average table request latency (ms) considered high
    pub max_table_latency_ms: f64,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            required_success_rate: 100.0,
            max_cpu_percent: 70.0,
            max_operation_latency_ms: 500.0,
            max_table_latency_ms: 20.0,
        }
    }
}

/// Report generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Results file written by the load-testing harness
    pub results_path: PathBuf,
    /// Directory holding CloudWatch metric snapshots
    pub metrics_dir: PathBuf,
    /// Where the JSON report is written
    pub output_path: PathBuf,
    /// Report from the other database backend, named in the comparison hint
    pub comparison_report_path: PathBuf,
    pub metrics: MetricSources,
    pub thresholds: AnalysisThresholds,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("dynamodb_test_results.json"),
            metrics_dir: PathBuf::from("cloudwatch_metrics_dynamodb"),
            output_path: PathBuf::from("comprehensive_dynamodb_report.json"),
            comparison_report_path: PathBuf::from("comprehensive_report.json"),
            metrics: MetricSources::default(),
            thresholds: AnalysisThresholds::default(),
        }
    }
}

impl ReportConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override paths from `CARTLOAD_*` environment variables if present
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_RESULTS_PATH) {
            debug!("{} overrides results path: {}", ENV_RESULTS_PATH, path);
            self.results_path = PathBuf::from(path);
        }

        if let Some(dir) = lookup(ENV_METRICS_DIR) {
            debug!("{} overrides metrics directory: {}", ENV_METRICS_DIR, dir);
            self.metrics_dir = PathBuf::from(dir);
        }

        if let Some(path) = lookup(ENV_OUTPUT_PATH) {
            debug!("{} overrides output path: {}", ENV_OUTPUT_PATH, path);
            self.output_path = PathBuf::from(path);
        }
    }
}

/// Load configuration from a file, or defaults, then apply environment overrides
pub fn load_config(path: Option<&Path>) -> Result<ReportConfig> {
    let mut config = match path {
        Some(path) => ReportConfig::from_file(path)?,
        None => ReportConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.results_path, PathBuf::from("dynamodb_test_results.json"));
        assert_eq!(config.metrics.products_table.user_errors.statistic, "Sum");
        assert_eq!(config.metrics.carts_table.putitem_latency.statistic, "Average");
        assert_eq!(config.metrics.alb.request_count.pattern, "alb_request_count_*.json");
        assert_eq!(config.thresholds.max_cpu_percent, 70.0);
    }

    #[test]
    fn test_config_file_operations() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested").join("report.toml");

        let mut config = ReportConfig::default();
        config.output_path = PathBuf::from("out/report.json");
        config.thresholds.max_table_latency_ms = 35.0;
        config.to_file(&config_path).unwrap();

        let loaded = ReportConfig::from_file(&config_path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ReportConfig = toml::from_str(
            r#"
            metrics_dir = "snapshots"

            [thresholds]
            max_cpu_percent = 85.0

            [metrics.ecs.cpu]
            pattern = "cpu_*.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.metrics_dir, PathBuf::from("snapshots"));
        assert_eq!(config.thresholds.max_cpu_percent, 85.0);
        assert_eq!(config.thresholds.max_operation_latency_ms, 500.0);
        assert_eq!(config.metrics.ecs.cpu.pattern, "cpu_*.json");
        assert_eq!(config.metrics.ecs.cpu.statistic, DEFAULT_STATISTIC);
        assert_eq!(config.output_path, PathBuf::from("comprehensive_dynamodb_report.json"));
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("broken.toml");
        std::fs::write(&config_path, "results_path = [").unwrap();

        let err = ReportConfig::from_file(&config_path).unwrap_err();
        assert!(matches!(err, crate::ReportError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_RESULTS_PATH, "/data/results.json"),
            (ENV_OUTPUT_PATH, "/data/report.json"),
        ]
        .into_iter()
        .collect();

        let mut config = ReportConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.results_path, PathBuf::from("/data/results.json"));
        assert_eq!(config.output_path, PathBuf::from("/data/report.json"));
        assert_eq!(config.metrics_dir, PathBuf::from("cloudwatch_metrics_dynamodb"));
    }
}
