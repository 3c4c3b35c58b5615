//! Cartload - shopping cart service load-test tooling
//!
//! This is the main crate that ties the Cartload reporting library to the
//! `report_generator` binary.

pub use cartload_report as report;

/// Re-export common types and utilities
pub mod prelude {
    pub use crate::report::analysis::{AnalysisResult, Grade};
    pub use crate::report::config::{load_config, ReportConfig};
    pub use crate::report::report::{generate_report, run, Report};
    pub use crate::report::{ReportError, TestRunOutput};
}
