//! Vitals Risk - Health-risk assessment for single vital-sign readings
//!
//! Each reading (heart rate, blood oxygen) goes through two independent checks:
//! an isolation-forest anomaly classifier trained once on synthetic normal
//! readings, and a fixed-rule risk score that drives tiered recommendations.
//!
//! ## Modules
//!
//! - **Evaluator**: Combine the classifier verdict, risk score and recommendations
//! - **Forest**: Isolation forest anomaly classifier
//! - **Server** (feature `server`): HTTP endpoint over the evaluator

pub mod config;
pub mod error;
pub mod evaluator;
pub mod forest;
pub mod recommendations;
pub mod scoring;
pub mod training;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{Config, ModelConfig, ServerConfig};
pub use error::{AssessError, ConfigError, Metric, ModelError};
pub use evaluator::{assess_json, default_evaluator, RiskEvaluator};
pub use forest::{AnomalyClassifier, IsolationForest};
pub use types::{AssessmentResult, Reading, Tier, Verdict, Vitals};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by the CLI and health checks
pub const SERVICE_NAME: &str = "vitals-risk";
