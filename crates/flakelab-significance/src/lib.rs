//! Simplified significance summaries for flakelab.
//!
//! This is a percentile/CI summary, not a rigorous hypothesis test: it
//! reports the mean, population spread, and the 2.5th/97.5th percentiles
//! of observed pass rates per configuration.

use flakelab_types::SignificanceSummary;
use statrs::statistics::Statistics;

/// Summarize a configuration's observed pass rates.
///
/// Returns `None` when there are no samples (a configuration whose every
/// run lost its signal has nothing to summarize).
pub fn confidence_summary(pass_rates: &[f64]) -> Option<SignificanceSummary> {
    if pass_rates.is_empty() {
        return None;
    }

    let mut sorted = pass_rates.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Some(SignificanceSummary {
        mean: pass_rates.mean(),
        std: pass_rates.population_std_dev(),
        ci_low: percentile_sorted(&sorted, 2.5),
        ci_high: percentile_sorted(&sorted, 97.5),
        sample_size: pass_rates.len() as u32,
    })
}

/// Linear-interpolation percentile over an ascending-sorted slice.
///
/// Matches the default estimator of common numeric stacks: rank
/// `p/100 * (n-1)` interpolated between its neighbors.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    debug_assert!((0.0..=100.0).contains(&p));

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let rank = p / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;

    if lo == hi {
        return sorted[lo];
    }

    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn empty_samples_have_no_summary() {
        assert_eq!(confidence_summary(&[]), None);
    }

    #[test]
    fn single_sample_collapses_the_interval() {
        let s = confidence_summary(&[0.8]).unwrap();
        assert_close(s.mean, 0.8);
        assert_close(s.ci_low, 0.8);
        assert_close(s.ci_high, 0.8);
        assert_eq!(s.sample_size, 1);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [0.0, 1.0];
        // rank 0.025 -> 0.0 + 1.0 * 0.025
        assert_close(percentile_sorted(&sorted, 2.5), 0.025);
        assert_close(percentile_sorted(&sorted, 97.5), 0.975);
        assert_close(percentile_sorted(&sorted, 50.0), 0.5);
    }

    #[test]
    fn percentile_hits_exact_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_close(percentile_sorted(&sorted, 0.0), 1.0);
        assert_close(percentile_sorted(&sorted, 25.0), 2.0);
        assert_close(percentile_sorted(&sorted, 100.0), 5.0);
        // rank 3.9 -> between 4.0 and 5.0
        assert_close(percentile_sorted(&sorted, 97.5), 4.9);
    }

    #[test]
    fn summary_over_unsorted_input() {
        let s = confidence_summary(&[0.5, 1.0, 0.0, 1.0, 0.5]).unwrap();
        assert_close(s.mean, 0.6);
        assert_eq!(s.sample_size, 5);
        assert!(s.ci_low <= s.mean && s.mean <= s.ci_high);
    }

    proptest! {
        #[test]
        fn interval_brackets_the_data(
            rates in prop::collection::vec(0.0f64..=1.0, 1..50)
        ) {
            let s = confidence_summary(&rates).unwrap();
            let min = rates.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = rates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(s.ci_low >= min - 1e-12);
            prop_assert!(s.ci_high <= max + 1e-12);
            prop_assert!(s.ci_low <= s.ci_high + 1e-12);
        }
    }
}
