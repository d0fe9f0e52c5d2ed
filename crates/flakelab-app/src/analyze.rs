//! Study analysis use case: aggregate collected trials, classify archetype
//! flakiness, score strategies against the baseline, and assemble the
//! study receipt.

use flakelab_domain::{CostModel, ScoreWeights, assess, profiles, recommend, score};
use flakelab_significance::confidence_summary;
use flakelab_stats::aggregate;
use flakelab_types::{
    AggregatedStats, Archetype, CostBenefitResult, EffectivenessResult, FlakinessAssessment,
    STUDY_SCHEMA_V1, SignificanceSummary, StudyMeta, StudyReceipt, ToolInfo, TrialResult,
};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("baseline configuration {0:?} is required to score strategies but was not collected")]
    MissingBaseline(String),
}

/// One collected batch of trials for a named configuration.
#[derive(Debug, Clone, Default)]
pub struct TrialBatch {
    pub trials: Vec<TrialResult>,
    pub duration_ms: u64,
}

impl TrialBatch {
    pub fn new(trials: Vec<TrialResult>, duration_ms: u64) -> Self {
        Self {
            trials,
            duration_ms,
        }
    }

    fn valid_pass_rates(&self) -> Vec<f64> {
        self.trials.iter().filter_map(|t| t.pass_rate).collect()
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    /// Baseline batches keyed by configuration name (archetype names plus
    /// aggregate configurations such as "all_flaky" or "stable_only").
    pub baseline: BTreeMap<String, TrialBatch>,

    /// Mitigation batches keyed by strategy name.
    pub mitigation: BTreeMap<String, TrialBatch>,

    /// Which baseline configuration strategies are scored against.
    pub baseline_key: String,

    pub weights: ScoreWeights,
    pub cost_model: CostModel,

    pub tool: ToolInfo,
    pub study: StudyMeta,
}

pub struct AnalyzeStudyUseCase;

impl AnalyzeStudyUseCase {
    /// Run the full analysis pipeline.
    ///
    /// Pure: no I/O, no hidden state. Cost-benefit is computed directly
    /// from the effectiveness results in the same pass.
    pub fn execute(req: AnalyzeRequest) -> Result<StudyReceipt, AnalyzeError> {
        let baseline_stats: BTreeMap<String, AggregatedStats> = req
            .baseline
            .iter()
            .map(|(name, batch)| (name.clone(), aggregate(&batch.trials, batch.duration_ms)))
            .collect();

        let mitigation_stats: BTreeMap<String, AggregatedStats> = req
            .mitigation
            .iter()
            .map(|(name, batch)| (name.clone(), aggregate(&batch.trials, batch.duration_ms)))
            .collect();

        let flakiness: BTreeMap<Archetype, FlakinessAssessment> = Archetype::ALL
            .into_iter()
            .filter_map(|archetype| {
                baseline_stats
                    .get(archetype.as_str())
                    .map(|observed| (archetype, assess(archetype, observed)))
            })
            .collect();

        let effectiveness: BTreeMap<String, EffectivenessResult> = if mitigation_stats.is_empty() {
            BTreeMap::new()
        } else {
            let baseline = baseline_stats
                .get(&req.baseline_key)
                .ok_or_else(|| AnalyzeError::MissingBaseline(req.baseline_key.clone()))?;

            mitigation_stats
                .iter()
                .map(|(name, stats)| (name.clone(), score(stats, baseline, req.weights)))
                .collect()
        };

        let cost_benefit: BTreeMap<String, CostBenefitResult> = effectiveness
            .iter()
            .map(|(name, eff)| (name.clone(), req.cost_model.evaluate(name, eff)))
            .collect();

        let significance: BTreeMap<String, SignificanceSummary> = req
            .baseline
            .iter()
            .filter_map(|(name, batch)| {
                confidence_summary(&batch.valid_pass_rates()).map(|s| (name.clone(), s))
            })
            .collect();

        let recommendations = recommend(profiles(), &effectiveness, &cost_benefit);

        Ok(StudyReceipt {
            schema: STUDY_SCHEMA_V1.to_string(),
            tool: req.tool,
            study: req.study,
            baseline: baseline_stats,
            mitigation: mitigation_stats,
            flakiness,
            effectiveness,
            cost_benefit,
            significance,
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flakelab_types::{HostInfo, Severity, Strategy};

    fn trial(run: u32, passed: u32, total: u32, wall_ms: u64) -> TrialResult {
        TrialResult::from_counts(run, Some(42), wall_ms, passed, total, 0).unwrap()
    }

    fn batch(rates: &[(u32, u32)], wall_ms: u64) -> TrialBatch {
        let trials = rates
            .iter()
            .enumerate()
            .map(|(i, (p, t))| trial(i as u32 + 1, *p, *t, wall_ms))
            .collect();
        TrialBatch::new(trials, 1_000)
    }

    fn meta() -> (ToolInfo, StudyMeta) {
        (
            ToolInfo {
                name: "flakelab".to_string(),
                version: "0.0.0".to_string(),
            },
            StudyMeta {
                id: "study-1".to_string(),
                started_at: "2026-01-01T00:00:00Z".to_string(),
                ended_at: "2026-01-01T01:00:00Z".to_string(),
                host: HostInfo {
                    os: "linux".to_string(),
                    arch: "x86_64".to_string(),
                },
            },
        )
    }

    fn request() -> AnalyzeRequest {
        let (tool, study) = meta();

        let mut baseline = BTreeMap::new();
        // Alternating pass/fail: severely flaky.
        baseline.insert(
            "randomness".to_string(),
            batch(&[(0, 1), (1, 1), (0, 1), (1, 1), (0, 1)], 1_000),
        );
        baseline.insert(
            "all_flaky".to_string(),
            batch(&[(2, 4), (2, 4), (2, 4), (2, 4)], 10_000),
        );

        let mut mitigation = BTreeMap::new();
        mitigation.insert(
            "retries".to_string(),
            batch(&[(4, 4), (3, 4), (4, 4), (3, 4)], 12_000),
        );

        AnalyzeRequest {
            baseline,
            mitigation,
            baseline_key: "all_flaky".to_string(),
            weights: ScoreWeights::default(),
            cost_model: CostModel::default(),
            tool,
            study,
        }
    }

    #[test]
    fn pipeline_produces_a_complete_receipt() {
        let receipt = AnalyzeStudyUseCase::execute(request()).unwrap();

        assert_eq!(receipt.schema, STUDY_SCHEMA_V1);
        assert_eq!(receipt.baseline.len(), 2);
        assert_eq!(receipt.mitigation.len(), 1);
        assert_eq!(receipt.flakiness.len(), 1);
        assert_eq!(receipt.effectiveness.len(), 1);
        assert_eq!(receipt.cost_benefit.len(), 1);
        assert_eq!(receipt.significance.len(), 2);
        assert_eq!(receipt.recommendations.by_archetype.len(), 5);
    }

    #[test]
    fn archetype_batches_are_classified() {
        let receipt = AnalyzeStudyUseCase::execute(request()).unwrap();
        let randomness = receipt.flakiness.get(&Archetype::Randomness).unwrap();
        assert_eq!(randomness.severity, Severity::Severe);
        // Observed 0.4 vs typical 0.5.
        assert!((randomness.deviation_from_expected - 0.1).abs() < 1e-9);
    }

    #[test]
    fn strategies_are_scored_against_the_baseline_key() {
        let receipt = AnalyzeStudyUseCase::execute(request()).unwrap();
        let retries = receipt.effectiveness.get("retries").unwrap();
        // 0.875 vs 0.5 baseline.
        assert!((retries.improvement_absolute - 0.375).abs() < 1e-9);
        assert!((retries.improvement_relative_percent - 75.0).abs() < 1e-9);
        assert!((retries.time_overhead_percent - 20.0).abs() < 1e-9);

        let cb = receipt.cost_benefit.get("retries").unwrap();
        assert!((cb.total_cost - 5.0).abs() < 1e-9);
        assert!((cb.benefit_score - 750.0).abs() < 1e-9);
    }

    #[test]
    fn missing_baseline_key_is_an_error_when_strategies_exist() {
        let mut req = request();
        req.baseline_key = "does_not_exist".to_string();
        let err = AnalyzeStudyUseCase::execute(req).unwrap_err();
        assert!(matches!(err, AnalyzeError::MissingBaseline(_)));
    }

    #[test]
    fn no_mitigation_data_skips_scoring_without_error() {
        let mut req = request();
        req.mitigation.clear();
        req.baseline_key = "does_not_exist".to_string();

        let receipt = AnalyzeStudyUseCase::execute(req).unwrap();
        assert!(receipt.effectiveness.is_empty());
        assert!(receipt.cost_benefit.is_empty());
        assert!(receipt.recommendations.priority_ranking.is_empty());
        // Static guidance is still emitted.
        assert_eq!(receipt.recommendations.by_scenario.len(), 4);
    }

    #[test]
    fn all_invalid_batch_has_no_significance_summary() {
        let mut req = request();
        req.baseline.insert(
            "order".to_string(),
            TrialBatch::new(
                vec![
                    TrialResult::no_signal(1, None, 10, -1),
                    TrialResult::no_signal(2, None, 10, -1),
                ],
                20,
            ),
        );

        let receipt = AnalyzeStudyUseCase::execute(req).unwrap();
        assert!(!receipt.significance.contains_key("order"));
        // The batch still aggregates (to zeros) and classifies.
        assert!(receipt.flakiness.contains_key(&Archetype::Order));
        assert_eq!(receipt.baseline.get("order").unwrap().valid_runs, 0);
    }

    #[test]
    fn cheaper_strategy_outranks_on_identical_benefit() {
        let mut req = request();
        let b = req.mitigation.get("retries").unwrap().clone();
        req.mitigation.insert(Strategy::Isolation.as_str().to_string(), b);

        let receipt = AnalyzeStudyUseCase::execute(req).unwrap();
        let ranking = &receipt.recommendations.priority_ranking;
        assert_eq!(ranking.len(), 2);
        // retries (2+1 cost) out-ROIs isolation (4+3) on identical benefit.
        assert_eq!(ranking[0].strategy, "retries");
        assert_eq!(
            ranking[0].recommendation,
            flakelab_domain::recommendation_tier(ranking[0].roi, ranking[0].effectiveness_score)
        );
    }
}
