//! Service configuration
//!
//! Configuration is plain serde data with defaults matching the reference
//! deployment. A JSON file can override any subset of fields.

use crate::error::{ConfigError, ModelError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default number of synthetic training samples
pub const DEFAULT_TRAINING_SAMPLES: usize = 1000;

/// Default seed for training data and forest construction
pub const DEFAULT_SEED: u64 = 42;

/// Default expected share of anomalous readings
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5100;

/// Anomaly model training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of synthetic normal samples to train on
    pub n_samples: usize,
    /// Seed shared by the data generator and the forest
    pub seed: u64,
    /// Expected anomaly share, sets the decision threshold
    pub contamination: f64,
    /// Number of isolation trees
    pub n_estimators: usize,
    /// Upper bound on samples drawn per tree
    pub max_samples: usize,
    /// Normal heart rate range used for training data (bpm)
    pub heart_rate_range: (f64, f64),
    /// Normal blood oxygen range used for training data (%)
    pub blood_oxygen_range: (f64, f64),
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_TRAINING_SAMPLES,
            seed: DEFAULT_SEED,
            contamination: DEFAULT_CONTAMINATION,
            n_estimators: 100,
            max_samples: 256,
            heart_rate_range: (60.0, 100.0),
            blood_oxygen_range: (95.0, 100.0),
        }
    }
}

impl ModelConfig {
    /// Check parameters that would make fitting impossible
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_samples == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidEstimators);
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ModelError::InvalidContamination(self.contamination));
        }
        check_range("heart_rate_range", self.heart_rate_range)?;
        check_range("blood_oxygen_range", self.blood_oxygen_range)?;
        Ok(())
    }
}

fn check_range(name: &'static str, (low, high): (f64, f64)) -> Result<(), ModelError> {
    if low.is_finite() && high.is_finite() && low < high {
        Ok(())
    } else {
        Err(ModelError::InvalidRange { name, low, high })
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Parse configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.model.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
