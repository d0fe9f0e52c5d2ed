//! Effectiveness scoring of a mitigation strategy against its baseline.

use flakelab_types::{AggregatedStats, EffectivenessResult};

/// Weights for the blended effectiveness score.
///
/// The defaults encode that correctness improvement matters more than speed
/// cost. They are data, not literals, so studies can vary them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScoreWeights {
    pub improvement: f64,
    pub overhead: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            improvement: 0.7,
            overhead: 0.3,
        }
    }
}

/// Compare a strategy's aggregated statistics against the baseline's.
///
/// Degenerate baselines (zero average pass rate or zero average time) make
/// the relative terms 0 by convention rather than an error; a baseline with
/// no passes cannot produce a meaningful relative improvement.
pub fn score(
    strategy: &AggregatedStats,
    baseline: &AggregatedStats,
    weights: ScoreWeights,
) -> EffectivenessResult {
    let improvement_absolute = strategy.avg_pass_rate - baseline.avg_pass_rate;

    let improvement_relative_percent = if baseline.avg_pass_rate > 0.0 {
        improvement_absolute / baseline.avg_pass_rate * 100.0
    } else {
        0.0
    };

    let time_overhead_percent = if baseline.avg_wall_ms > 0.0 {
        (strategy.avg_wall_ms - baseline.avg_wall_ms) / baseline.avg_wall_ms * 100.0
    } else {
        0.0
    };

    // Near-zero overhead would amplify the ratio; clamp the denominator to 1.
    let cost_effectiveness_ratio = if time_overhead_percent > 0.0 {
        improvement_relative_percent / time_overhead_percent.max(1.0)
    } else {
        improvement_relative_percent
    };

    EffectivenessResult {
        improvement_absolute,
        improvement_relative_percent,
        time_overhead_percent,
        absolute_time_increase_ms: strategy.avg_wall_ms - baseline.avg_wall_ms,
        cost_effectiveness_ratio,
        effectiveness_score: effectiveness_score(
            improvement_relative_percent,
            time_overhead_percent,
            weights,
        ),
    }
}

/// Weighted blend of normalized improvement and overhead penalty, floored at 0.
pub fn effectiveness_score(
    improvement_percent: f64,
    overhead_percent: f64,
    weights: ScoreWeights,
) -> f64 {
    let improvement_norm = (improvement_percent / 100.0).min(1.0);
    let overhead_penalty = (overhead_percent / 100.0).min(1.0);

    let blended = improvement_norm * weights.improvement - overhead_penalty * weights.overhead;
    blended.max(0.0)
}
