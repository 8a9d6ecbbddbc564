//! Synthetic training data
//!
//! The anomaly model is trained on readings drawn uniformly from the normal
//! heart rate and blood oxygen ranges. Generation is seeded so the model is
//! identical across runs.

use crate::config::ModelConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate `config.n_samples` (heart_rate, blood_oxygen) pairs
pub fn synthetic_normal_readings(config: &ModelConfig) -> Vec<[f64; 2]> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (hr_low, hr_high) = config.heart_rate_range;
    let (bo_low, bo_high) = config.blood_oxygen_range;

    // All heart rates first, then all blood oxygen values.
    let heart_rates: Vec<f64> = (0..config.n_samples)
        .map(|_| rng.gen_range(hr_low..hr_high))
        .collect();
    let blood_oxygen: Vec<f64> = (0..config.n_samples)
        .map(|_| rng.gen_range(bo_low..bo_high))
        .collect();

    heart_rates
        .into_iter()
        .zip(blood_oxygen)
        .map(|(hr, bo)| [hr, bo])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_count_and_ranges() {
        let config = ModelConfig::default();
        let samples = synthetic_normal_readings(&config);

        assert_eq!(samples.len(), 1000);
        for [hr, bo] in &samples {
            assert!((60.0..100.0).contains(hr));
            assert!((95.0..100.0).contains(bo));
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let config = ModelConfig::default();
        assert_eq!(
            synthetic_normal_readings(&config),
            synthetic_normal_readings(&config)
        );

        let other = ModelConfig {
            seed: 7,
            ..ModelConfig::default()
        };
        assert_ne!(
            synthetic_normal_readings(&config),
            synthetic_normal_readings(&other)
        );
    }

    #[test]
    fn test_samples_spread_across_range() {
        let samples = synthetic_normal_readings(&ModelConfig::default());
        let mean_hr = samples.iter().map(|s| s[0]).sum::<f64>() / samples.len() as f64;
        let mean_bo = samples.iter().map(|s| s[1]).sum::<f64>() / samples.len() as f64;

        assert!((mean_hr - 80.0).abs() < 3.0);
        assert!((mean_bo - 97.5).abs() < 0.5);
    }
}
