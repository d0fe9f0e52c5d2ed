//! Trial aggregation for flakelab.
//!
//! This crate is intentionally I/O-free: it reduces a finite batch of
//! trials to summary statistics. Results are order-independent, so the
//! trial source owes no ordering guarantee.

use flakelab_types::{AggregatedStats, TrialResult};
use statrs::statistics::Statistics;

/// Reduce a batch of trials to summary statistics.
///
/// Trials without a defined pass rate ("no signal") are excluded from the
/// pass-rate statistics. An all-invalid or empty batch yields zeros rather
/// than an error: flakiness analysis must tolerate partial data, since
/// flaky infrastructure is the thing being studied.
pub fn aggregate(trials: &[TrialResult], duration_ms: u64) -> AggregatedStats {
    let valid: Vec<&TrialResult> = trials.iter().filter(|t| t.is_valid()).collect();

    let rates: Vec<f64> = valid.iter().filter_map(|t| t.pass_rate).collect();

    let (avg_pass_rate, std_pass_rate) = if rates.is_empty() {
        (0.0, 0.0)
    } else {
        ((&rates).mean(), (&rates).population_std_dev())
    };

    let avg_wall_ms = if valid.is_empty() {
        0.0
    } else {
        let walls: Vec<f64> = valid.iter().map(|t| t.wall_ms as f64).collect();
        (&walls).mean()
    };

    AggregatedStats {
        avg_pass_rate,
        std_pass_rate,
        flakiness_index: flakiness_index(&rates),
        avg_wall_ms,
        total_runs: trials.len() as u32,
        valid_runs: valid.len() as u32,
        duration_ms,
    }
}

/// Coefficient of variation of pass rates (std / mean).
///
/// A zero mean with nonzero spread is the maximal instability signal and
/// maps to 1.0; no data maps to 0.0.
pub fn flakiness_index(rates: &[f64]) -> f64 {
    if rates.is_empty() {
        return 0.0;
    }

    let mean = rates.mean();
    let std = rates.population_std_dev();

    if mean == 0.0 {
        return if std > 0.0 { 1.0 } else { 0.0 };
    }

    std / mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn trial(run: u32, passed: u32, total: u32, wall_ms: u64) -> TrialResult {
        TrialResult::from_counts(run, Some(42), wall_ms, passed, total, 0).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn stable_suite_has_zero_flakiness() {
        let trials: Vec<TrialResult> = (1..=5).map(|i| trial(i, 4, 4, 100)).collect();
        let stats = aggregate(&trials, 500);
        assert_close(stats.avg_pass_rate, 1.0);
        assert_close(stats.std_pass_rate, 0.0);
        assert_close(stats.flakiness_index, 0.0);
        assert_eq!(stats.total_runs, 5);
        assert_eq!(stats.valid_runs, 5);
    }

    #[test]
    fn alternating_pass_fail_is_severely_flaky() {
        // Pass rates [0, 1, 0, 1, 0]: mean 0.4, population std sqrt(0.24).
        let trials = vec![
            trial(1, 0, 1, 100),
            trial(2, 1, 1, 100),
            trial(3, 0, 1, 100),
            trial(4, 1, 1, 100),
            trial(5, 0, 1, 100),
        ];
        let stats = aggregate(&trials, 500);
        assert_close(stats.avg_pass_rate, 0.4);
        assert!((stats.std_pass_rate - 0.489898).abs() < 1e-5);
        assert!((stats.flakiness_index - 1.224745).abs() < 1e-5);
    }

    #[test]
    fn no_signal_trials_are_excluded() {
        let trials = vec![
            trial(1, 1, 1, 100),
            TrialResult::no_signal(2, Some(42), 50, -1),
            trial(3, 1, 1, 300),
        ];
        let stats = aggregate(&trials, 450);
        assert_eq!(stats.total_runs, 3);
        assert_eq!(stats.valid_runs, 2);
        assert_close(stats.avg_pass_rate, 1.0);
        assert_close(stats.avg_wall_ms, 200.0);
    }

    #[test]
    fn all_invalid_yields_zeros_not_an_error() {
        let trials = vec![
            TrialResult::no_signal(1, None, 10, 2),
            TrialResult::no_signal(2, None, 12, 2),
        ];
        let stats = aggregate(&trials, 22);
        assert_eq!(stats.valid_runs, 0);
        assert_close(stats.avg_pass_rate, 0.0);
        assert_close(stats.std_pass_rate, 0.0);
        assert_close(stats.flakiness_index, 0.0);
        assert_close(stats.avg_wall_ms, 0.0);
    }

    #[test]
    fn empty_batch_yields_zeros() {
        let stats = aggregate(&[], 0);
        assert_eq!(stats.total_runs, 0);
        assert_close(stats.flakiness_index, 0.0);
    }

    #[test]
    fn zero_mean_with_spread_is_maximal_instability() {
        // All-zero rates have no spread; the index stays 0.
        assert_close(flakiness_index(&[0.0, 0.0, 0.0]), 0.0);
        // A negative/positive mix averaging to zero cannot come from real
        // pass rates, but the helper still guards the division.
        assert_close(flakiness_index(&[-0.5, 0.5]), 1.0);
    }

    proptest! {
        #[test]
        fn index_is_never_negative(rates in prop::collection::vec(0.0f64..=1.0, 0..50)) {
            prop_assert!(flakiness_index(&rates) >= 0.0);
        }

        #[test]
        fn equal_rates_give_zero_index(rate in 0.0f64..=1.0, n in 1usize..30) {
            let rates = vec![rate; n];
            prop_assert!(flakiness_index(&rates).abs() < 1e-12);
        }

        #[test]
        fn aggregation_is_order_independent(
            counts in prop::collection::vec((0u32..=4, 1u32..=4), 1..30),
            rotate_by in 0usize..30,
        ) {
            let trials: Vec<TrialResult> = counts
                .iter()
                .enumerate()
                .map(|(i, (p, t))| {
                    let passed = (*p).min(*t);
                    trial(i as u32 + 1, passed, *t, 100 + i as u64)
                })
                .collect();

            let mut rotated = trials.clone();
            rotated.rotate_left(rotate_by % trials.len().max(1));

            let a = aggregate(&trials, 1000);
            let b = aggregate(&rotated, 1000);

            prop_assert!((a.avg_pass_rate - b.avg_pass_rate).abs() < 1e-9);
            prop_assert!((a.std_pass_rate - b.std_pass_rate).abs() < 1e-9);
            prop_assert!((a.flakiness_index - b.flakiness_index).abs() < 1e-9);
        }
    }
}
