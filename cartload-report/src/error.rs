use std::path::PathBuf;
use thiserror::Error;

/// Main error type for report generation
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{} not found", .0.display())]
    ResultsNotFound(PathBuf),

    #[error("Failed to read {}: {reason}", .path.display())]
    InvalidResults { path: PathBuf, reason: String },

    #[error("Invalid metric pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl From<toml::de::Error> for ReportError {
    fn from(error: toml::de::Error) -> Self {
        ReportError::Config(error.to_string())
    }
}

impl From<toml::ser::Error> for ReportError {
    fn from(error: toml::ser::Error) -> Self {
        ReportError::Config(error.to_string())
    }
}

impl ReportError {
    /// Whether this error means the run's results file could not be used
    pub fn is_missing_results(&self) -> bool {
        matches!(
            self,
            ReportError::ResultsNotFound(_) | ReportError::InvalidResults { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
