//! Risk scoring
//!
//! Fixed-threshold severity scoring:
//! - Heart rate outside 60-100 bpm scores by distance to the nearer bound,
//!   reaching 100 at 20 bpm out
//! - Blood oxygen below 95% scores by shortfall, reaching 100 at 5 points under
//! - The combined score weights blood oxygen at 0.6 and heart rate at 0.4

use crate::types::Vitals;

/// Normal resting heart rate range (bpm)
pub const HEART_RATE_NORMAL: (f64, f64) = (60.0, 100.0);

/// Lowest normal blood oxygen saturation (%)
pub const BLOOD_OXYGEN_NORMAL_MIN: f64 = 95.0;

/// Heart rate deviation (bpm) that maps to full risk
const HEART_RATE_FULL_RISK_DEVIATION: f64 = 20.0;

/// Blood oxygen shortfall (percentage points) that maps to full risk
const BLOOD_OXYGEN_FULL_RISK_DEVIATION: f64 = 5.0;

const HEART_RATE_WEIGHT: f64 = 0.4;
const BLOOD_OXYGEN_WEIGHT: f64 = 0.6;

/// Per-metric and combined risk for one reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBreakdown {
    pub heart_rate_risk: f64,
    pub blood_oxygen_risk: f64,
    pub score: f64,
}

impl RiskBreakdown {
    pub fn compute(vitals: &Vitals) -> Self {
        let heart_rate_risk = heart_rate_risk(vitals.heart_rate);
        let blood_oxygen_risk = blood_oxygen_risk(vitals.blood_oxygen);
        let score = (heart_rate_risk * HEART_RATE_WEIGHT + blood_oxygen_risk * BLOOD_OXYGEN_WEIGHT)
            .clamp(0.0, 100.0);

        Self {
            heart_rate_risk,
            blood_oxygen_risk,
            score,
        }
    }
}

/// Combined risk score (0-100)
pub fn risk_score(vitals: &Vitals) -> f64 {
    RiskBreakdown::compute(vitals).score
}

/// Heart rate sub-score (0-100)
pub fn heart_rate_risk(heart_rate: f64) -> f64 {
    let (low, high) = HEART_RATE_NORMAL;
    if (low..=high).contains(&heart_rate) {
        return 0.0;
    }

    let deviation = (heart_rate - low).abs().min((heart_rate - high).abs());
    (deviation / HEART_RATE_FULL_RISK_DEVIATION * 100.0).min(100.0)
}

/// Blood oxygen sub-score (0-100)
pub fn blood_oxygen_risk(blood_oxygen: f64) -> f64 {
    if blood_oxygen >= BLOOD_OXYGEN_NORMAL_MIN {
        return 0.0;
    }

    let deviation = BLOOD_OXYGEN_NORMAL_MIN - blood_oxygen;
    (deviation / BLOOD_OXYGEN_FULL_RISK_DEVIATION * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(heart_rate: f64, blood_oxygen: f64) -> Vitals {
        Vitals {
            heart_rate,
            blood_oxygen,
        }
    }

    #[test]
    fn test_normal_ranges_score_zero() {
        for hr in [60.0, 61.5, 75.0, 99.9, 100.0] {
            for bo in [95.0, 97.0, 100.0] {
                assert_eq!(risk_score(&vitals(hr, bo)), 0.0, "hr={hr} bo={bo}");
            }
        }
    }

    #[test]
    fn test_heart_rate_risk_uses_nearer_bound() {
        assert_eq!(heart_rate_risk(110.0), 50.0);
        assert_eq!(heart_rate_risk(50.0), 50.0);
        assert_eq!(heart_rate_risk(120.0), 100.0);
        assert!((heart_rate_risk(55.0) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_heart_rate_risk_caps_at_100() {
        assert_eq!(heart_rate_risk(1000.0), 100.0);
        assert_eq!(heart_rate_risk(-50.0), 100.0);
    }

    #[test]
    fn test_blood_oxygen_risk() {
        assert_eq!(blood_oxygen_risk(93.0), 40.0);
        assert_eq!(blood_oxygen_risk(90.0), 100.0);
        assert_eq!(blood_oxygen_risk(85.0), 100.0);
        assert_eq!(blood_oxygen_risk(120.0), 0.0);
    }

    #[test]
    fn test_weighted_combination() {
        let breakdown = RiskBreakdown::compute(&vitals(120.0, 97.0));
        assert_eq!(breakdown.heart_rate_risk, 100.0);
        assert_eq!(breakdown.blood_oxygen_risk, 0.0);
        assert!((breakdown.score - 40.0).abs() < 1e-9);

        let breakdown = RiskBreakdown::compute(&vitals(80.0, 85.0));
        assert!((breakdown.score - 60.0).abs() < 1e-9);

        // 0.4 * 50 + 0.6 * 40 = 44
        assert!((risk_score(&vitals(110.0, 93.0)) - 44.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_bounded_at_extremes() {
        for (hr, bo) in [(1000.0, 1.0), (-1000.0, -1000.0), (1e300, 1e300), (0.001, 200.0)] {
            let score = risk_score(&vitals(hr, bo));
            assert!((0.0..=100.0).contains(&score), "hr={hr} bo={bo} score={score}");
        }
        assert_eq!(risk_score(&vitals(1000.0, 50.0)), 100.0);
    }
}
