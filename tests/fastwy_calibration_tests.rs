//! Integration tests for FastWY permutation calibration

mod utils;

use lamp::config::LampConfig;
use lamp::pipeline::run_fastwy;
use lamp::stats::{Alternative, TestFamily};

#[test]
fn test_fastwy_records_every_permutation_in_seed_order() {
    let report = run_fastwy(&utils::items(), &utils::values(), &LampConfig::default(), 50).unwrap();

    assert_eq!(report.permutations.len(), 50);
    for (seed, record) in report.permutations.iter().enumerate() {
        assert_eq!(record.seed, seed as u64);
        assert!(record.min_p_value > 0.0 && record.min_p_value <= 1.0);
        if record.items.is_some() {
            assert!(record.support >= 1);
        }
    }
    assert!(report.adjusted_threshold > 0.0 && report.adjusted_threshold <= 1.0);
}

#[test]
fn test_fastwy_threshold_is_a_trial_minimum() {
    let report = run_fastwy(&utils::items(), &utils::values(), &LampConfig::default(), 40).unwrap();
    let minima: Vec<f64> = report.permutations.iter().map(|r| r.min_p_value).collect();
    assert!(minima.contains(&report.adjusted_threshold));

    // At most alpha * permutations trials may fall strictly below the level
    let below = minima
        .iter()
        .filter(|&&p| p < report.adjusted_threshold)
        .count();
    assert!(below <= 2);
}

#[test]
fn test_fastwy_significant_within_threshold() {
    let config = LampConfig {
        alpha: 0.2,
        ..LampConfig::default()
    };
    let report = run_fastwy(&utils::items(), &utils::values(), &config, 30).unwrap();

    assert_eq!(report.significant.len(), report.adjusted_p_values.len());
    for (combination, adjusted) in report.significant.iter().zip(&report.adjusted_p_values) {
        assert!(combination.p_value <= report.adjusted_threshold);
        assert!(*adjusted >= 0.0 && *adjusted <= 1.0);
    }
    for pair in report.significant.windows(2) {
        assert!(pair[0].p_value <= pair[1].p_value);
    }
    for pair in report.adjusted_p_values.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[test]
fn test_fastwy_is_deterministic() {
    let config = LampConfig {
        method: TestFamily::UTest,
        ..LampConfig::default()
    };
    let first = run_fastwy(&utils::items(), &utils::expression(), &config, 20).unwrap();
    let single_thread = LampConfig {
        jobs: Some(1),
        ..config.clone()
    };
    let second = run_fastwy(&utils::items(), &utils::expression(), &single_thread, 20).unwrap();

    let minima = |r: &lamp::pipeline::FastWyReport| -> Vec<f64> {
        r.permutations.iter().map(|p| p.min_p_value).collect()
    };
    assert_eq!(minima(&first), minima(&second));
    assert_eq!(first.adjusted_threshold, second.adjusted_threshold);
    assert_eq!(first.significant, second.significant);
}

#[test]
fn test_fastwy_less_restores_statistics() {
    let config = LampConfig {
        alternative: Alternative::Less,
        alpha: 0.5,
        ..LampConfig::default()
    };
    let report = run_fastwy(&utils::items(), &utils::values_reversed(), &config, 20).unwrap();
    for combination in &report.significant {
        match combination.statistic {
            lamp::stats::Statistic::PositiveCount(count) => assert!(count <= combination.support),
            other => panic!("expected a positive count, got {:?}", other),
        }
    }
}

#[test]
fn test_fastwy_requires_permutations() {
    let err = run_fastwy(&utils::items(), &utils::values(), &LampConfig::default(), 0).unwrap_err();
    assert!(err.to_string().contains("at least one permutation"));
}
