//! Recommendation selection
//!
//! Tiers are chosen from an ordered rule table, first match wins. The critical
//! rule looks at raw vitals only, so physiological extremes override whatever
//! the weighted score says.

use crate::types::{Tier, Vitals};

/// Blood oxygen below this is critical (%)
pub const CRITICAL_BLOOD_OXYGEN: f64 = 90.0;

/// Heart rate above this is critical (bpm)
pub const CRITICAL_HEART_RATE_HIGH: f64 = 150.0;

/// Heart rate below this is critical (bpm)
pub const CRITICAL_HEART_RATE_LOW: f64 = 40.0;

/// Scores above this are high risk
pub const HIGH_RISK_SCORE: f64 = 70.0;

/// Scores above this are moderate risk
pub const MODERATE_RISK_SCORE: f64 = 40.0;

const HIGH_MESSAGES: [&str; 3] = [
    "Contact your healthcare provider soon",
    "Monitor vital signs closely",
    "Rest and avoid physical exertion",
];

const MODERATE_MESSAGES: [&str; 3] = [
    "Continue monitoring your vital signs",
    "Consider contacting your healthcare provider if symptoms persist",
    "Take rest and stay hydrated",
];

const NORMAL_MESSAGES: [&str; 3] = [
    "Vital signs are within normal range",
    "Continue normal activities",
    "Stay hydrated and maintain regular monitoring",
];

/// One row of the selection table
pub struct Rule {
    pub tier: Tier,
    applies: fn(&Vitals, f64) -> bool,
}

impl Rule {
    pub fn applies(&self, vitals: &Vitals, score: f64) -> bool {
        (self.applies)(vitals, score)
    }
}

/// Selection table in priority order. The last row always applies.
pub static RULES: [Rule; 4] = [
    Rule {
        tier: Tier::Critical,
        applies: |v, _| is_critical(v),
    },
    Rule {
        tier: Tier::High,
        applies: |_, score| score > HIGH_RISK_SCORE,
    },
    Rule {
        tier: Tier::Moderate,
        applies: |_, score| score > MODERATE_RISK_SCORE,
    },
    Rule {
        tier: Tier::Normal,
        applies: |_, _| true,
    },
];

/// True when any raw vital crosses a critical threshold
pub fn is_critical(vitals: &Vitals) -> bool {
    vitals.blood_oxygen < CRITICAL_BLOOD_OXYGEN
        || vitals.heart_rate > CRITICAL_HEART_RATE_HIGH
        || vitals.heart_rate < CRITICAL_HEART_RATE_LOW
}

/// First tier in the table whose rule applies
pub fn select_tier(vitals: &Vitals, score: f64) -> Tier {
    RULES
        .iter()
        .find(|rule| rule.applies(vitals, score))
        .map(|rule| rule.tier)
        .unwrap_or(Tier::Normal)
}

/// Messages for `tier`; the critical set restates the triggering values
pub fn messages_for(tier: Tier, vitals: &Vitals) -> Vec<String> {
    match tier {
        Tier::Critical => vec![
            "URGENT: Immediate medical attention required".to_string(),
            "Contact emergency services immediately".to_string(),
            format!(
                "Critical values detected: HR={}, SpO2={}%",
                vitals.heart_rate, vitals.blood_oxygen
            ),
        ],
        Tier::High => owned_messages(&HIGH_MESSAGES),
        Tier::Moderate => owned_messages(&MODERATE_MESSAGES),
        Tier::Normal => owned_messages(&NORMAL_MESSAGES),
    }
}

fn owned_messages(messages: &[&str]) -> Vec<String> {
    messages.iter().map(|m| m.to_string()).collect()
}

/// Select the tier and its messages
pub fn recommend(vitals: &Vitals, score: f64) -> (Tier, Vec<String>) {
    let tier = select_tier(vitals, score);
    (tier, messages_for(tier, vitals))
}
