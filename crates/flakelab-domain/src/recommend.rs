//! Recommendation assembly: per-archetype guidance, ROI ranking, scenarios.

use crate::classify::implementation_notes;
use flakelab_types::{
    Archetype, ArchetypeRecommendation, CostBenefitResult, EffectivenessResult, FlakinessProfile,
    RankedStrategy, Recommendations, ScenarioGuidance, Strategy,
};
use std::collections::BTreeMap;

/// Assemble the final recommendations structure.
///
/// Deterministic by construction: per-archetype winners iterate the
/// effectiveness map in canonical strategy order and keep the first maximum;
/// the priority ranking is a stable sort over a canonically-ordered input,
/// so ROI ties preserve canonical order.
pub fn recommend(
    profiles: &BTreeMap<Archetype, FlakinessProfile>,
    effectiveness: &BTreeMap<String, EffectivenessResult>,
    cost_benefit: &BTreeMap<String, CostBenefitResult>,
) -> Recommendations {
    Recommendations {
        by_archetype: by_archetype(profiles),
        priority_ranking: priority_ranking(effectiveness, cost_benefit),
        by_scenario: scenario_guidance(),
        general_guidelines: general_guidelines(),
    }
}

fn by_archetype(
    profiles: &BTreeMap<Archetype, FlakinessProfile>,
) -> BTreeMap<Archetype, ArchetypeRecommendation> {
    profiles
        .iter()
        .filter_map(|(archetype, profile)| {
            // BTreeMap<Strategy, _> iterates in canonical order; strictly-greater
            // comparison keeps the earliest strategy on ties.
            let (primary, expected) = profile
                .mitigation_effectiveness
                .iter()
                .fold(None::<(Strategy, f64)>, |best, (s, e)| match best {
                    Some((_, be)) if *e <= be => best,
                    _ => Some((*s, *e)),
                })?;

            Some((
                *archetype,
                ArchetypeRecommendation {
                    primary,
                    expected_effectiveness: expected,
                    rationale: format!(
                        "Best suited for {}",
                        profile.failure_mechanism.to_lowercase()
                    ),
                    implementation_notes: implementation_notes(*archetype, primary),
                },
            ))
        })
        .collect()
}

fn priority_ranking(
    effectiveness: &BTreeMap<String, EffectivenessResult>,
    cost_benefit: &BTreeMap<String, CostBenefitResult>,
) -> Vec<RankedStrategy> {
    // Seed in canonical order first, then any extra strategies by name.
    let mut names: Vec<&String> = Vec::new();
    for s in Strategy::ALL {
        if let Some((name, _)) = cost_benefit.get_key_value(s.as_str()) {
            names.push(name);
        }
    }
    for name in cost_benefit.keys() {
        if Strategy::from_name(name).is_none() {
            names.push(name);
        }
    }

    let mut ranked: Vec<RankedStrategy> = names
        .into_iter()
        .filter_map(|name| {
            let cb = cost_benefit.get(name)?;
            let score = effectiveness
                .get(name)
                .map(|e| e.effectiveness_score)
                .unwrap_or(0.0);
            Some(RankedStrategy {
                strategy: name.clone(),
                roi: cb.roi,
                effectiveness_score: score,
                recommendation: cb.recommendation,
            })
        })
        .collect();

    // Stable sort: equal ROIs keep the seeded order.
    ranked.sort_by(|a, b| b.roi.partial_cmp(&a.roi).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

fn scenario_guidance() -> Vec<ScenarioGuidance> {
    let table = [
        (
            "high_resource_constraints",
            Strategy::Retries,
            "Low implementation and maintenance cost",
            "Moderate effectiveness but minimal overhead",
        ),
        (
            "external_dependencies",
            Strategy::Mocking,
            "Eliminates external failure points",
            "Higher maintenance but very effective",
        ),
        (
            "concurrent_testing",
            Strategy::Isolation,
            "Prevents race conditions and state sharing",
            "Slower execution but reliable results",
        ),
        (
            "comprehensive_solution",
            Strategy::Combined,
            "Maximum effectiveness across all flakiness types",
            "Highest cost but best results",
        ),
    ];

    table
        .into_iter()
        .map(
            |(scenario, strategy, rationale, trade_offs)| ScenarioGuidance {
                scenario: scenario.to_string(),
                recommended_strategy: strategy,
                rationale: rationale.to_string(),
                trade_offs: trade_offs.to_string(),
            },
        )
        .collect()
}

fn general_guidelines() -> Vec<String> {
    [
        "Start with retries for quick wins with minimal investment",
        "Identify root causes of flakiness before choosing mitigation strategy",
        "Mock external dependencies in CI/CD pipelines",
        "Use test isolation for tests with shared state",
        "Monitor test stability metrics continuously",
        "Invest in fixing root causes rather than just mitigating symptoms",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
