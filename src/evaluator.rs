//! Evaluation pipeline
//!
//! This module provides the public API for Vitals Risk. It combines the
//! anomaly classifier verdict with the rule-based score and recommendations
//! for a single reading.

use crate::config::ModelConfig;
use crate::error::{AssessError, ModelError};
use crate::forest::{AnomalyClassifier, IsolationForest};
use crate::recommendations::recommend;
use crate::scoring::RiskBreakdown;
use crate::training::synthetic_normal_readings;
use crate::types::{AssessmentResult, Reading};
use chrono::{DateTime, Utc};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Assess a raw JSON reading with the process-wide default evaluator.
///
/// The default model is trained on first use and reused afterwards.
///
/// # Arguments
/// * `raw_json` - JSON object with `heart_rate` and `blood_oxygen`
///
/// # Returns
/// The assessment record as JSON
///
/// # Example
/// ```ignore
/// let result = assess_json(r#"{"heart_rate": 75, "blood_oxygen": 98}"#.to_string())?;
/// ```
pub fn assess_json(raw_json: String) -> Result<String, AssessError> {
    default_evaluator()?.evaluate_json(&raw_json)
}

/// Evaluator trained with `ModelConfig::default()`, built once per process
pub fn default_evaluator() -> Result<&'static RiskEvaluator, AssessError> {
    static DEFAULT: OnceLock<Result<RiskEvaluator, ModelError>> = OnceLock::new();

    DEFAULT
        .get_or_init(|| RiskEvaluator::train(&ModelConfig::default()))
        .as_ref()
        .map_err(|e| AssessError::Model(e.clone()))
}

/// Stateless evaluator holding a read-only anomaly classifier.
///
/// Share it behind an `Arc` (or a `'static` reference) across requests; no
/// evaluation mutates it.
#[derive(Debug, Clone)]
pub struct RiskEvaluator<C = IsolationForest> {
    classifier: C,
}

impl RiskEvaluator<IsolationForest> {
    /// Generate the synthetic training set and fit the isolation forest
    pub fn train(config: &ModelConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let samples = synthetic_normal_readings(config);
        let forest = IsolationForest::fit(&samples, config)?;
        info!("Model trained with sample data. Ready to process health metrics.");
        Ok(Self::new(forest))
    }
}

impl<C: AnomalyClassifier> RiskEvaluator<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Assess one reading, stamped with the current time
    pub fn evaluate(&self, reading: &Reading) -> Result<AssessmentResult, AssessError> {
        self.evaluate_at(reading, Utc::now())
    }

    /// Assess one reading with an explicit timestamp
    pub fn evaluate_at(
        &self,
        reading: &Reading,
        timestamp: DateTime<Utc>,
    ) -> Result<AssessmentResult, AssessError> {
        let vitals = reading.vitals().inspect_err(|e| {
            debug!(error = %e, ?reading, "Reading rejected");
        })?;

        let is_anomaly = self.classifier.predict(&vitals).is_anomalous();
        let risk = RiskBreakdown::compute(&vitals);
        let (tier, recommendations) = recommend(&vitals, risk.score);

        debug!(
            heart_rate = vitals.heart_rate,
            blood_oxygen = vitals.blood_oxygen,
            heart_rate_risk = risk.heart_rate_risk,
            blood_oxygen_risk = risk.blood_oxygen_risk,
            risk_score = risk.score,
            tier = %tier,
            is_anomaly,
            "Reading assessed"
        );

        Ok(AssessmentResult {
            timestamp,
            is_anomaly,
            risk_score: risk.score,
            recommendations,
            tier,
        })
    }

    /// Parse a JSON reading, assess it and encode the result as JSON
    pub fn evaluate_json(&self, raw_json: &str) -> Result<String, AssessError> {
        let reading = Reading::from_json(raw_json)?;
        self.evaluate(&reading)?.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Metric;
    use crate::types::{Tier, Verdict, Vitals};
    use pretty_assertions::assert_eq;

    /// Classifier with a fixed answer
    struct Always(Verdict);

    impl AnomalyClassifier for Always {
        fn predict(&self, _vitals: &Vitals) -> Verdict {
            self.0
        }
    }

    fn fixed() -> RiskEvaluator<Always> {
        RiskEvaluator::new(Always(Verdict::Normal))
    }

    fn assess(heart_rate: f64, blood_oxygen: f64) -> AssessmentResult {
        fixed().evaluate(&Reading::new(heart_rate, blood_oxygen)).unwrap()
    }

    #[test]
    fn test_normal_reading() {
        let result = assess(75.0, 98.0);
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.tier, Tier::Normal);
        assert_eq!(
            result.recommendations,
            vec![
                "Vital signs are within normal range",
                "Continue normal activities",
                "Stay hydrated and maintain regular monitoring",
            ]
        );
    }

    #[test]
    fn test_score_of_exactly_40_is_normal() {
        let result = assess(120.0, 97.0);
        assert_eq!(result.risk_score, 40.0);
        assert_eq!(result.tier, Tier::Normal);
    }

    #[test]
    fn test_low_oxygen_is_critical_despite_moderate_score() {
        let result = assess(80.0, 85.0);
        assert_eq!(result.risk_score, 60.0);
        assert_eq!(result.tier, Tier::Critical);
        assert_eq!(
            result.recommendations[2],
            "Critical values detected: HR=80, SpO2=85%"
        );
    }

    #[test]
    fn test_tachycardia_is_critical() {
        let result = assess(160.0, 99.0);
        assert_eq!(result.tier, Tier::Critical);
        assert_eq!(result.recommendations[0], "URGENT: Immediate medical attention required");
    }

    #[test]
    fn test_high_tier() {
        // 0.4 * 100 + 0.6 * 60 = 76, no critical threshold crossed
        let result = assess(125.0, 92.0);
        assert!((result.risk_score - 76.0).abs() < 1e-9);
        assert_eq!(result.tier, Tier::High);
        assert_eq!(result.recommendations[0], "Contact your healthcare provider soon");
    }

    #[test]
    fn test_moderate_tier() {
        let result = assess(110.0, 93.0);
        assert!((result.risk_score - 44.0).abs() < 1e-9);
        assert_eq!(result.tier, Tier::Moderate);
    }

    #[test]
    fn test_missing_metric() {
        let evaluator = fixed();
        let reading = Reading {
            heart_rate: None,
            blood_oxygen: Some(97.0),
        };
        assert!(matches!(
            evaluator.evaluate(&reading),
            Err(AssessError::MissingMetric(Metric::HeartRate))
        ));

        assert!(matches!(
            evaluator.evaluate(&Reading::new(80.0, 0.0)),
            Err(AssessError::MissingMetric(Metric::BloodOxygen))
        ));
    }

    #[test]
    fn test_anomaly_reported_independently() {
        let flagged = RiskEvaluator::new(Always(Verdict::Anomalous));
        let result = flagged.evaluate(&Reading::new(75.0, 98.0)).unwrap();

        assert!(result.is_anomaly);
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.tier, Tier::Normal);
    }

    #[test]
    fn test_evaluate_at_uses_given_timestamp() {
        let at: DateTime<Utc> = "2024-01-15T14:00:00Z".parse().unwrap();
        let result = fixed().evaluate_at(&Reading::new(75.0, 98.0), at).unwrap();
        assert_eq!(result.timestamp, at);
    }

    #[test]
    fn test_evaluate_json() {
        let json = fixed()
            .evaluate_json(r#"{"heart_rate": 160, "blood_oxygen": 99}"#)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["is_anomaly"], false);
        assert_eq!(value["risk_score"], 100.0 * 0.4);
        assert_eq!(value["recommendations"].as_array().unwrap().len(), 3);
        assert!(value["timestamp"].as_str().is_some());
    }

    #[test]
    fn test_evaluate_json_invalid() {
        assert!(matches!(
            fixed().evaluate_json("not valid json"),
            Err(AssessError::JsonError(_))
        ));
    }

    #[test]
    fn test_trained_evaluator_end_to_end() {
        let evaluator = RiskEvaluator::train(&ModelConfig::default()).unwrap();

        let normal = evaluator.evaluate(&Reading::new(75.0, 98.0)).unwrap();
        assert!(!normal.is_anomaly);
        assert_eq!(normal.tier, Tier::Normal);

        let extreme = evaluator.evaluate(&Reading::new(1000.0, 50.0)).unwrap();
        assert!(extreme.is_anomaly);
        assert_eq!(extreme.risk_score, 100.0);
        assert_eq!(extreme.tier, Tier::Critical);
    }

    #[test]
    fn test_train_rejects_invalid_config() {
        let config = ModelConfig {
            n_samples: 0,
            ..ModelConfig::default()
        };
        assert_eq!(
            RiskEvaluator::train(&config).unwrap_err(),
            ModelError::EmptyTrainingSet
        );
    }

    #[test]
    fn test_assess_json_default_evaluator() {
        let json = assess_json(r#"{"heart_rate": 75, "blood_oxygen": 98}"#.to_string()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["risk_score"], 0.0);

        let err = assess_json(r#"{"heart_rate": 75}"#.to_string()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required health metrics");
    }
}
