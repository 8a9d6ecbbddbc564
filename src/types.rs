//! Core types for the Vitals Risk assessment
//!
//! This module defines the data structures that flow through an evaluation:
//! the inbound reading, the validated vital pair, the classifier verdict and the
//! assessment returned to the caller.

use crate::error::{AssessError, Metric};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single physiological reading as submitted by a caller.
///
/// Both metrics are optional at the wire level so that absence can be reported
/// as a domain error rather than a decoding failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Heart rate (beats per minute)
    #[serde(default)]
    pub heart_rate: Option<f64>,
    /// Blood oxygen saturation (percentage, 0-100)
    #[serde(default)]
    pub blood_oxygen: Option<f64>,
}

impl Reading {
    pub fn new(heart_rate: f64, blood_oxygen: f64) -> Self {
        Self {
            heart_rate: Some(heart_rate),
            blood_oxygen: Some(blood_oxygen),
        }
    }

    /// Parse a reading from a JSON object
    pub fn from_json(json: &str) -> Result<Self, AssessError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Extract both metrics, failing with `MissingMetric` when either is absent.
    ///
    /// A value of exactly `0` counts as absent. No range validation is done:
    /// physiologically implausible values pass through and get scored.
    pub fn vitals(&self) -> Result<Vitals, AssessError> {
        let heart_rate = present(self.heart_rate).ok_or(AssessError::MissingMetric(Metric::HeartRate))?;
        let blood_oxygen =
            present(self.blood_oxygen).ok_or(AssessError::MissingMetric(Metric::BloodOxygen))?;

        Ok(Vitals {
            heart_rate,
            blood_oxygen,
        })
    }
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// A reading with both metrics supplied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    pub heart_rate: f64,
    pub blood_oxygen: f64,
}

impl Vitals {
    /// Feature vector in the order the anomaly model was trained on
    pub fn features(&self) -> [f64; 2] {
        [self.heart_rate, self.blood_oxygen]
    }
}

/// Anomaly classifier verdict for a single point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Normal,
    Anomalous,
}

impl Verdict {
    pub fn is_anomalous(&self) -> bool {
        matches!(self, Verdict::Anomalous)
    }
}

/// Recommendation tier, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Critical,
    High,
    Moderate,
    Normal,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Critical => "critical",
            Tier::High => "high",
            Tier::Moderate => "moderate",
            Tier::Normal => "normal",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assessment returned for one reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResult {
    /// When the assessment was computed (UTC, ISO-8601)
    pub timestamp: DateTime<Utc>,
    /// Classifier verdict, reported independently of the score
    pub is_anomaly: bool,
    /// Weighted severity score (0-100)
    pub risk_score: f64,
    /// Messages of exactly one tier, in display order
    pub recommendations: Vec<String>,
    /// Tier the recommendations were drawn from
    #[serde(skip)]
    pub tier: Tier,
}

impl AssessmentResult {
    /// Serialize to the JSON response record
    pub fn to_json(&self) -> Result<String, AssessError> {
        Ok(serde_json::to_string(self)?)
    }
}
