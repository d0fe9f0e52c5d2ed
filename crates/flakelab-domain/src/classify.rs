//! Classification of observed flakiness against the five reference archetypes.

use flakelab_types::{
    AggregatedStats, Archetype, FlakinessAssessment, FlakinessProfile, Predictability, Severity,
    Strategy,
};
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn profile(
    description: &str,
    failure_mechanism: &str,
    typical_pass_rate: f64,
    effectiveness: [(Strategy, f64); 4],
) -> FlakinessProfile {
    FlakinessProfile {
        description: description.to_string(),
        failure_mechanism: failure_mechanism.to_string(),
        typical_pass_rate,
        mitigation_effectiveness: effectiveness.into_iter().collect(),
    }
}

/// The reference profile for one archetype.
///
/// Total over the enum, so lookups through [`profiles`] can never miss.
fn reference_profile(archetype: Archetype) -> FlakinessProfile {
    match archetype {
        Archetype::Randomness => profile(
            "Tests dependent on random values or probabilistic outcomes",
            "Non-deterministic assertions based on random values",
            0.5,
            [
                (Strategy::Retries, 0.3),
                (Strategy::Mocking, 0.9),
                (Strategy::Isolation, 0.1),
                (Strategy::Combined, 0.9),
            ],
        ),
        Archetype::Timeout => profile(
            "Tests sensitive to timing and performance variations",
            "Time-dependent assertions failing under load or slow systems",
            0.7,
            [
                (Strategy::Retries, 0.6),
                (Strategy::Mocking, 0.4),
                (Strategy::Isolation, 0.8),
                (Strategy::Combined, 0.8),
            ],
        ),
        Archetype::Order => profile(
            "Tests dependent on execution order or global state",
            "Shared state between tests causing order dependencies",
            0.6,
            [
                (Strategy::Retries, 0.2),
                (Strategy::Mocking, 0.5),
                (Strategy::Isolation, 0.9),
                (Strategy::Combined, 0.9),
            ],
        ),
        Archetype::External => profile(
            "Tests dependent on external systems (APIs, databases, network)",
            "Network failures, service unavailability, or slow responses",
            0.7,
            [
                (Strategy::Retries, 0.7),
                (Strategy::Mocking, 0.95),
                (Strategy::Isolation, 0.3),
                (Strategy::Combined, 0.95),
            ],
        ),
        Archetype::Race => profile(
            "Tests with race conditions and concurrency issues",
            "Thread synchronization issues and timing-dependent failures",
            0.8,
            [
                (Strategy::Retries, 0.4),
                (Strategy::Mocking, 0.6),
                (Strategy::Isolation, 0.9),
                (Strategy::Combined, 0.9),
            ],
        ),
    }
}

/// The reference profiles for the five flakiness archetypes.
///
/// Built once per process; callers treat the table as a constant.
pub fn profiles() -> &'static BTreeMap<Archetype, FlakinessProfile> {
    static PROFILES: OnceLock<BTreeMap<Archetype, FlakinessProfile>> = OnceLock::new();
    PROFILES.get_or_init(|| {
        Archetype::ALL
            .into_iter()
            .map(|a| (a, reference_profile(a)))
            .collect()
    })
}

/// Severity band of a flakiness index. Monotonic threshold ladder, no gaps.
pub fn classify_severity(flakiness_index: f64) -> Severity {
    if flakiness_index < 0.1 {
        Severity::Low
    } else if flakiness_index < 0.3 {
        Severity::Moderate
    } else if flakiness_index < 0.6 {
        Severity::High
    } else {
        Severity::Severe
    }
}

/// Predictability band of a pass-rate standard deviation.
pub fn classify_predictability(std_pass_rate: f64) -> Predictability {
    if std_pass_rate < 0.1 {
        Predictability::HighlyPredictable
    } else if std_pass_rate < 0.2 {
        Predictability::ModeratelyPredictable
    } else if std_pass_rate < 0.3 {
        Predictability::LowPredictability
    } else {
        Predictability::Unpredictable
    }
}

/// Implementation note for an (archetype, strategy) pair.
///
/// Untabulated pairs get the templated fallback; that is the designed
/// behavior for combinations nobody has written guidance for yet.
pub fn implementation_notes(archetype: Archetype, strategy: Strategy) -> String {
    use Archetype as A;
    use Strategy as S;

    let tabulated = match (archetype, strategy) {
        (A::Randomness, S::Mocking) => Some("Mock random number generators with fixed values"),
        (A::Randomness, S::Retries) => {
            Some("Multiple attempts may eventually succeed due to randomness")
        }
        (A::Timeout, S::Isolation) => {
            Some("Run tests in isolated processes to reduce resource contention")
        }
        (A::Timeout, S::Retries) => Some("Retry failed tests as timing issues may be transient"),
        (A::Order, S::Isolation) => {
            Some("Essential for preventing state sharing between tests")
        }
        (A::Order, S::Mocking) => Some("Mock shared resources to prevent state conflicts"),
        (A::External, S::Mocking) => Some("Mock all external API calls and services"),
        (A::External, S::Retries) => {
            Some("Retry on network failures or service unavailability")
        }
        (A::Race, S::Isolation) => {
            Some("Run tests in separate processes to eliminate race conditions")
        }
        (A::Race, S::Mocking) => {
            Some("Mock concurrent operations to ensure deterministic behavior")
        }
        _ => None,
    };

    match tabulated {
        Some(note) => note.to_string(),
        None => format!("Apply {strategy} strategy for {archetype} tests"),
    }
}

/// Classify one archetype's observed baseline statistics.
pub fn assess(archetype: Archetype, observed: &AggregatedStats) -> FlakinessAssessment {
    let profile = reference_profile(archetype);

    FlakinessAssessment {
        archetype,
        deviation_from_expected: (observed.avg_pass_rate - profile.typical_pass_rate).abs(),
        severity: classify_severity(observed.flakiness_index),
        predictability: classify_predictability(observed.std_pass_rate),
        observed: observed.clone(),
        profile,
    }
}
