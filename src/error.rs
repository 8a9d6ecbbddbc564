//! Error types for Vitals Risk

use std::fmt;
use thiserror::Error;

/// The vital sign a reading failed to supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    HeartRate,
    BloodOxygen,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heart_rate",
            Metric::BloodOxygen => "blood_oxygen",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while assessing a reading
#[derive(Debug, Error)]
pub enum AssessError {
    /// The message is part of the HTTP contract; the metric is kept for logs.
    #[error("Missing required health metrics")]
    MissingMetric(Metric),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Anomaly model unavailable: {0}")]
    Model(#[from] ModelError),
}

impl AssessError {
    /// True for errors caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, AssessError::MissingMetric(_) | AssessError::JsonError(_))
    }
}

/// Errors raised while fitting the anomaly model
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Training sample {index} is not finite")]
    NonFiniteSample { index: usize },

    #[error("Contamination must be in (0, 0.5], got {0}")]
    InvalidContamination(f64),

    #[error("Number of estimators must be positive")]
    InvalidEstimators,

    #[error("Invalid range for {name}: [{low}, {high}]")]
    InvalidRange { name: &'static str, low: f64, high: f64 },
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ModelError),
}
