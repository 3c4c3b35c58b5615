//! CloudWatch metric aggregation
//!
//! Reduces the datapoints of each metric family to an [`AggregateStats`] and
//! assembles the per-category tree that goes into the report.

use crate::config::{MetricSource, ReportConfig};
use crate::loader::load_metric_family;
use crate::utils::round2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub use crate::config::DEFAULT_STATISTIC;

/// One timestamped sample from CloudWatch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDatapoint {
    #[serde(rename = "Timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
    /// Statistic fields such as `Average`, `Sum` or `Maximum`
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl MetricDatapoint {
    /// Numeric value of `field`, if present
    pub fn value(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(|v| v.as_f64())
    }
}

/// Min/max/avg/count over one statistic field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}

/// Aggregate `field` over `datapoints`.
///
/// Datapoints without a numeric `field` are ignored. Returns `None` when no
/// datapoint carries the field; min, max and avg are rounded to 2 decimals.
pub fn aggregate(datapoints: &[MetricDatapoint], field: &str) -> Option<AggregateStats> {
    let values: Vec<f64> = datapoints.iter().filter_map(|dp| dp.value(field)).collect();
    if values.is_empty() {
        return None;
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;

    Some(AggregateStats {
        min: round2(min),
        max: round2(max),
        avg: round2(avg),
        count: values.len(),
    })
}

/// Products table aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductsTableMetrics {
    pub read_capacity: Option<AggregateStats>,
    pub write_capacity: Option<AggregateStats>,
    pub getitem_latency: Option<AggregateStats>,
    pub user_errors: Option<AggregateStats>,
}

/// Carts table aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartsTableMetrics {
    pub read_capacity: Option<AggregateStats>,
    pub write_capacity: Option<AggregateStats>,
    pub putitem_latency: Option<AggregateStats>,
    pub getitem_latency: Option<AggregateStats>,
    pub user_errors: Option<AggregateStats>,
}

/// ECS service aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcsMetrics {
    pub cpu: Option<AggregateStats>,
    pub memory: Option<AggregateStats>,
}

/// Load balancer aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbMetrics {
    pub response_time: Option<AggregateStats>,
    pub request_count: Option<AggregateStats>,
    pub healthy_hosts: Option<AggregateStats>,
}

/// Every aggregate in the report, keyed by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudWatchMetrics {
    pub products_table: ProductsTableMetrics,
    pub carts_table: CartsTableMetrics,
    pub ecs: EcsMetrics,
    pub alb: AlbMetrics,
}

impl CloudWatchMetrics {
    /// Number of aggregates that had data
    pub fn present(&self) -> usize {
        let p = &self.products_table;
        let c = &self.carts_table;
        [
            p.read_capacity,
            p.write_capacity,
            p.getitem_latency,
            p.user_errors,
            c.read_capacity,
            c.write_capacity,
            c.putitem_latency,
            c.getitem_latency,
            c.user_errors,
            self.ecs.cpu,
            self.ecs.memory,
            self.alb.response_time,
            self.alb.request_count,
            self.alb.healthy_hosts,
        ]
        .iter()
        .filter(|stats| stats.is_some())
        .count()
    }
}

fn collect(config: &ReportConfig, source: &MetricSource) -> Option<AggregateStats> {
    let family = load_metric_family(config, &source.pattern);
    let stats = aggregate(&family.datapoints, &source.statistic);
    debug!(
        "{} ({}): {} files loaded, {} skipped, {} datapoints",
        source.pattern,
        source.statistic,
        family.loaded(),
        family.skipped(),
        family.datapoints.len()
    );
    stats
}

/// Load and aggregate every configured metric family
pub fn collect_cloudwatch_metrics(config: &ReportConfig) -> CloudWatchMetrics {
    let sources = &config.metrics;

    let metrics = CloudWatchMetrics {
        products_table: ProductsTableMetrics {
            read_capacity: collect(config, &sources.products_table.read_capacity),
            write_capacity: collect(config, &sources.products_table.write_capacity),
            getitem_latency: collect(config, &sources.products_table.getitem_latency),
            user_errors: collect(config, &sources.products_table.user_errors),
        },
        carts_table: CartsTableMetrics {
            read_capacity: collect(config, &sources.carts_table.read_capacity),
            write_capacity: collect(config, &sources.carts_table.write_capacity),
            putitem_latency: collect(config, &sources.carts_table.putitem_latency),
            getitem_latency: collect(config, &sources.carts_table.getitem_latency),
            user_errors: collect(config, &sources.carts_table.user_errors),
        },
        ecs: EcsMetrics {
            cpu: collect(config, &sources.ecs.cpu),
            memory: collect(config, &sources.ecs.memory),
        },
        alb: AlbMetrics {
            response_time: collect(config, &sources.alb.response_time),
            request_count: collect(config, &sources.alb.request_count),
            healthy_hosts: collect(config, &sources.alb.healthy_hosts),
        },
    };

    info!(
        "Collected {} metric aggregates from {}",
        metrics.present(),
        config.metrics_dir.display()
    );
    metrics
}
