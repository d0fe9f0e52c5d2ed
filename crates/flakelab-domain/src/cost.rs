//! Cost-benefit policy: static cost tables, ROI, and recommendation tiers.

use flakelab_types::{CostBenefitResult, EffectivenessResult, RecommendationTier, Strategy};
use std::collections::BTreeMap;

/// Static implementation/maintenance costs per strategy, relative scale 1-10.
///
/// Keyed by name so strategies unknown to the table (added to a study before
/// their costs are estimated) flow through with a neutral default instead of
/// failing.
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    implementation: BTreeMap<String, f64>,
    maintenance: BTreeMap<String, f64>,
}

impl CostModel {
    pub const DEFAULT_COST: f64 = 5.0;

    pub fn implementation_cost(&self, strategy: &str) -> f64 {
        self.implementation
            .get(strategy)
            .copied()
            .unwrap_or(Self::DEFAULT_COST)
    }

    pub fn maintenance_cost(&self, strategy: &str) -> f64 {
        self.maintenance
            .get(strategy)
            .copied()
            .unwrap_or(Self::DEFAULT_COST)
    }

    /// Combine a strategy's effectiveness with the cost tables.
    pub fn evaluate(&self, strategy: &str, eff: &EffectivenessResult) -> CostBenefitResult {
        let implementation_cost = self.implementation_cost(strategy);
        let maintenance_cost = self.maintenance_cost(strategy);
        let performance_overhead_cost = eff.time_overhead_percent / 10.0;

        let total_cost = implementation_cost + maintenance_cost + performance_overhead_cost;
        let benefit_score = eff.improvement_relative_percent * 10.0;

        let roi = if total_cost > 0.0 {
            (benefit_score - total_cost) / total_cost
        } else {
            0.0
        };

        CostBenefitResult {
            implementation_cost,
            maintenance_cost,
            performance_overhead_cost,
            total_cost,
            benefit_score,
            roi,
            recommendation: recommendation_tier(roi, eff.effectiveness_score),
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        let implementation = [
            (Strategy::Retries, 2.0),
            (Strategy::Mocking, 6.0),
            (Strategy::Isolation, 4.0),
            (Strategy::Combined, 8.0),
        ];
        let maintenance = [
            (Strategy::Retries, 1.0),
            (Strategy::Mocking, 7.0),
            (Strategy::Isolation, 3.0),
            (Strategy::Combined, 9.0),
        ];

        Self {
            implementation: implementation
                .into_iter()
                .map(|(s, c)| (s.as_str().to_string(), c))
                .collect(),
            maintenance: maintenance
                .into_iter()
                .map(|(s, c)| (s.as_str().to_string(), c))
                .collect(),
        }
    }
}

/// Ordered rule ladder, first match wins.
pub fn recommendation_tier(roi: f64, effectiveness_score: f64) -> RecommendationTier {
    if roi > 2.0 && effectiveness_score > 0.5 {
        RecommendationTier::HighlyRecommended
    } else if roi > 1.0 && effectiveness_score > 0.3 {
        RecommendationTier::Recommended
    } else if effectiveness_score > 0.6 {
        RecommendationTier::ConsiderIfEffectivenessPriority
    } else if roi > 0.5 {
        RecommendationTier::ConsiderForCostSensitive
    } else {
        RecommendationTier::NotRecommended
    }
}
