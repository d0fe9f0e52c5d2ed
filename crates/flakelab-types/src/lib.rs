//! Shared types for flakelab.
//!
//! Design goal: versioned, explicit, boring.
//! These structs are used for trial receipts, study receipts, and the
//! TOML study configuration. They carry no behavior beyond construction
//! invariants; all math lives in the domain crates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const TRIALS_SCHEMA_V1: &str = "flakelab.trials.v1";
pub const STUDY_SCHEMA_V1: &str = "flakelab.study.v1";

#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("tests_passed ({passed}) exceeds tests_total ({total})")]
    PassedExceedsTotal { passed: u32, total: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StudyMeta {
    pub id: String,
    pub started_at: String,
    pub ended_at: String,
    pub host: HostInfo,
}

/// How a suite configuration was invoked to produce a batch of trials.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SuiteMeta {
    pub name: String,

    /// Marker expression selecting which tests ran (free text, runner-defined).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,

    /// argv vector (no shell parsing).
    pub command: Vec<String>,

    pub runs: u32,
    pub seeds: Vec<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// One execution of a suite configuration.
///
/// `pass_rate == None` means "no signal": the run produced no parseable
/// result (crash before report, malformed report). That is distinct from a
/// zero pass rate and is filtered out of aggregation, never propagated as
/// an error.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TrialResult {
    pub run_number: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub wall_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_rate: Option<f64>,

    pub tests_passed: u32,
    pub tests_total: u32,
    pub return_code: i32,
}

impl TrialResult {
    /// Build a trial from raw counts.
    ///
    /// `pass_rate` is derived: `passed / total`, undefined when `total == 0`.
    pub fn from_counts(
        run_number: u32,
        seed: Option<u64>,
        wall_ms: u64,
        tests_passed: u32,
        tests_total: u32,
        return_code: i32,
    ) -> Result<Self, TypesError> {
        if tests_passed > tests_total {
            return Err(TypesError::PassedExceedsTotal {
                passed: tests_passed,
                total: tests_total,
            });
        }
        let pass_rate = if tests_total == 0 {
            None
        } else {
            Some(f64::from(tests_passed) / f64::from(tests_total))
        };
        Ok(Self {
            run_number,
            seed,
            wall_ms,
            pass_rate,
            tests_passed,
            tests_total,
            return_code,
        })
    }

    /// The record for a run that yielded no usable signal.
    pub fn no_signal(run_number: u32, seed: Option<u64>, wall_ms: u64, return_code: i32) -> Self {
        Self {
            run_number,
            seed,
            wall_ms,
            pass_rate: None,
            tests_passed: 0,
            tests_total: 0,
            return_code,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.pass_rate.is_some()
    }
}

/// Summary statistics over one batch of trials.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AggregatedStats {
    /// Mean pass rate over valid trials (0.0 when there are none).
    pub avg_pass_rate: f64,

    /// Population standard deviation of valid pass rates.
    pub std_pass_rate: f64,

    /// Coefficient of variation of pass rates; higher = less deterministic.
    pub flakiness_index: f64,

    pub avg_wall_ms: f64,

    pub total_runs: u32,
    pub valid_runs: u32,

    /// Wall-clock time to produce the whole batch.
    pub duration_ms: u64,
}

/// The five reference flakiness categories.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Randomness,
    Timeout,
    Order,
    External,
    Race,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::Randomness,
        Archetype::Timeout,
        Archetype::Order,
        Archetype::External,
        Archetype::Race,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Archetype::Randomness => "randomness",
            Archetype::Timeout => "timeout",
            Archetype::Order => "order",
            Archetype::External => "external",
            Archetype::Race => "race",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mitigation strategies, in canonical order.
///
/// Declaration order is load-bearing: every deterministic tie break in the
/// recommendation engine follows it (retries, mocking, isolation, combined).
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Retries,
    Mocking,
    Isolation,
    Combined,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Retries,
        Strategy::Mocking,
        Strategy::Isolation,
        Strategy::Combined,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Retries => "retries",
            Strategy::Mocking => "mocking",
            Strategy::Isolation => "isolation",
            Strategy::Combined => "combined",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static reference data for one flakiness archetype.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FlakinessProfile {
    pub description: String,
    pub failure_mechanism: String,

    /// Expected baseline pass rate for this archetype.
    pub typical_pass_rate: f64,

    /// Expected effectiveness per strategy, in [0, 1].
    pub mitigation_effectiveness: BTreeMap<Strategy, f64>,
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Severe,
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Predictability {
    HighlyPredictable,
    ModeratelyPredictable,
    LowPredictability,
    Unpredictable,
}

/// Per-strategy comparison against the baseline batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EffectivenessResult {
    pub improvement_absolute: f64,

    /// Relative pass-rate improvement in percent; 0 when the baseline
    /// average is 0 (a baseline with no passes has no meaningful relative
    /// improvement).
    pub improvement_relative_percent: f64,

    /// 0 when the baseline time is 0.
    pub time_overhead_percent: f64,

    pub absolute_time_increase_ms: f64,

    pub cost_effectiveness_ratio: f64,

    /// Weighted blend of normalized improvement and overhead penalty, in [0, 1].
    pub effectiveness_score: f64,
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    HighlyRecommended,
    Recommended,
    ConsiderIfEffectivenessPriority,
    ConsiderForCostSensitive,
    NotRecommended,
}

impl RecommendationTier {
    pub fn message(self) -> &'static str {
        match self {
            RecommendationTier::HighlyRecommended => {
                "Highly recommended - excellent ROI and effectiveness"
            }
            RecommendationTier::Recommended => "Recommended - good balance of cost and benefit",
            RecommendationTier::ConsiderIfEffectivenessPriority => {
                "Consider if effectiveness is priority over cost"
            }
            RecommendationTier::ConsiderForCostSensitive => {
                "Consider for cost-sensitive environments"
            }
            RecommendationTier::NotRecommended => "Not recommended - poor cost-benefit ratio",
        }
    }
}

impl fmt::Display for RecommendationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Per-strategy economic assessment on the synthetic 1-10 cost scale.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CostBenefitResult {
    pub implementation_cost: f64,
    pub maintenance_cost: f64,

    /// time_overhead_percent / 10.
    pub performance_overhead_cost: f64,

    pub total_cost: f64,

    /// improvement_relative_percent * 10.
    pub benefit_score: f64,

    /// (benefit - total_cost) / total_cost; 0 when total_cost is 0.
    pub roi: f64,

    pub recommendation: RecommendationTier,
}

/// Classification of one archetype's observed baseline behavior.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FlakinessAssessment {
    pub archetype: Archetype,
    pub profile: FlakinessProfile,
    pub observed: AggregatedStats,
    pub severity: Severity,
    pub predictability: Predictability,

    /// |observed avg pass rate - profile typical pass rate|.
    pub deviation_from_expected: f64,
}

/// Simplified 95% interval over observed pass rates (percentile bounds,
/// not a rigorous hypothesis test).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SignificanceSummary {
    pub mean: f64,
    pub std: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub sample_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ArchetypeRecommendation {
    pub primary: Strategy,
    pub expected_effectiveness: f64,
    pub rationale: String,
    pub implementation_notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RankedStrategy {
    pub strategy: String,
    pub roi: f64,
    pub effectiveness_score: f64,
    pub recommendation: RecommendationTier,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ScenarioGuidance {
    pub scenario: String,
    pub recommended_strategy: Strategy,
    pub rationale: String,
    pub trade_offs: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Recommendations {
    pub by_archetype: BTreeMap<Archetype, ArchetypeRecommendation>,
    pub priority_ranking: Vec<RankedStrategy>,
    pub by_scenario: Vec<ScenarioGuidance>,
    pub general_guidelines: Vec<String>,
}

/// Receipt for one collected batch of trials (one suite configuration).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TrialsReceipt {
    pub schema: String,
    pub tool: ToolInfo,
    pub study: StudyMeta,
    pub suite: SuiteMeta,
    pub trials: Vec<TrialResult>,
    pub stats: AggregatedStats,
}

/// Receipt for a full study analysis.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct StudyReceipt {
    pub schema: String,
    pub tool: ToolInfo,
    pub study: StudyMeta,

    /// Aggregates per baseline configuration (archetype names plus
    /// e.g. "stable_only" / "all_flaky").
    pub baseline: BTreeMap<String, AggregatedStats>,

    /// Aggregates per mitigation strategy.
    pub mitigation: BTreeMap<String, AggregatedStats>,

    pub flakiness: BTreeMap<Archetype, FlakinessAssessment>,
    pub effectiveness: BTreeMap<String, EffectivenessResult>,
    pub cost_benefit: BTreeMap<String, CostBenefitResult>,
    pub significance: BTreeMap<String, SignificanceSummary>,
    pub recommendations: Recommendations,
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default, rename = "suite")]
    pub suites: Vec<SuiteConfigFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seeds: Option<Vec<u64>>,

    /// Duration string parseable by humantime, e.g. "30s".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SuiteConfigFile {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// argv vector (no shell parsing).
    pub command: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Re-seed each run with `seed * 1000 + run_number` instead of a fixed
    /// seed, preserving run-to-run randomness for randomness suites.
    #[serde(default)]
    pub per_run_seed: bool,
}
