//! Trial collection use case: drive the suite runner, parse each run's
//! report, assemble a trials receipt.

use crate::{Clock, host_info};
use anyhow::Context;
use flakelab_adapters::{SuiteRunner, SuiteSpec};
use flakelab_types::{
    StudyMeta, SuiteMeta, TRIALS_SCHEMA_V1, ToolInfo, TrialResult, TrialsReceipt,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How the per-run seed is derived from the configured seed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SeedMode {
    /// Every run of a seed group gets the seed unchanged.
    Fixed,

    /// Each run gets `seed * 1000 + run_number`, so randomness suites keep
    /// their run-to-run variability while staying reproducible.
    PerRun,
}

impl SeedMode {
    fn derive(self, seed: u64, run_number: u32) -> u64 {
        match self {
            SeedMode::Fixed => seed,
            SeedMode::PerRun => seed.wrapping_mul(1000).wrapping_add(u64::from(run_number)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub name: String,
    pub markers: Option<String>,

    /// argv vector (no shell parsing).
    pub command: Vec<String>,

    pub cwd: Option<PathBuf>,

    /// Runs per seed.
    pub runs: u32,
    pub seeds: Vec<u64>,
    pub seed_mode: SeedMode,

    pub timeout: Option<Duration>,
    pub env: Vec<(String, String)>,
    pub output_cap_bytes: usize,

    /// Report file the suite writes each run; forwarded to the runner.
    pub report_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub receipt: TrialsReceipt,

    /// Human-readable notes on runs that produced no signal (for CI logs).
    pub reasons: Vec<String>,
}

pub struct CollectTrialsUseCase<R: SuiteRunner, C: Clock> {
    runner: R,
    clock: C,
    tool: ToolInfo,
}

impl<R: SuiteRunner, C: Clock> CollectTrialsUseCase<R, C> {
    pub fn new(runner: R, clock: C, tool: ToolInfo) -> Self {
        Self {
            runner,
            clock,
            tool,
        }
    }

    pub fn execute(&self, req: CollectRequest) -> anyhow::Result<CollectOutcome> {
        let study_id = uuid::Uuid::new_v4().to_string();
        let started_at = self.clock.now_rfc3339();
        let batch_start = Instant::now();

        let mut trials: Vec<TrialResult> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();

        for &seed in &req.seeds {
            for run_number in 1..=req.runs {
                let run_seed = req.seed_mode.derive(seed, run_number);

                let mut env = req.env.clone();
                env.push(("RANDOM_SEED".to_string(), run_seed.to_string()));

                let spec = SuiteSpec {
                    argv: req.command.clone(),
                    cwd: req.cwd.clone(),
                    env,
                    timeout: req.timeout,
                    output_cap_bytes: req.output_cap_bytes,
                    report_file: req.report_file.clone(),
                };

                let run = self.runner.run(&spec).with_context(|| {
                    format!(
                        "failed to run suite (seed {seed}, run {run_number}): {:?}",
                        spec.argv
                    )
                })?;

                let trial = trial_from_report(
                    run.report.as_deref(),
                    run_number,
                    Some(seed),
                    run.wall_ms,
                    run.exit_code,
                );

                if !trial.is_valid() {
                    reasons.push(if run.timed_out {
                        format!("seed {seed} run {run_number} timed out with no report")
                    } else {
                        format!("seed {seed} run {run_number} produced no usable report")
                    });
                }

                trials.push(trial);
            }
        }

        let duration_ms = batch_start.elapsed().as_millis() as u64;
        let stats = flakelab_stats::aggregate(&trials, duration_ms);

        let ended_at = self.clock.now_rfc3339();

        let receipt = TrialsReceipt {
            schema: TRIALS_SCHEMA_V1.to_string(),
            tool: self.tool.clone(),
            study: StudyMeta {
                id: study_id,
                started_at,
                ended_at,
                host: host_info(),
            },
            suite: SuiteMeta {
                name: req.name,
                markers: req.markers,
                command: req.command,
                runs: req.runs,
                seeds: req.seeds,
                timeout_ms: req.timeout.map(|d| d.as_millis() as u64),
            },
            trials,
            stats,
        };

        Ok(CollectOutcome { receipt, reasons })
    }
}

#[derive(Debug, Deserialize)]
struct SuiteReport {
    #[serde(default)]
    summary: SuiteSummary,
}

#[derive(Debug, Default, Deserialize)]
struct SuiteSummary {
    #[serde(default)]
    passed: u32,

    #[serde(default = "default_total")]
    total: u32,
}

fn default_total() -> u32 {
    1
}

/// Build a trial record from a run's report bytes.
///
/// Any failure to parse a consistent report degrades to the no-signal
/// record; collection never aborts on a single bad run.
fn trial_from_report(
    report: Option<&[u8]>,
    run_number: u32,
    seed: Option<u64>,
    wall_ms: u64,
    return_code: i32,
) -> TrialResult {
    let Some(bytes) = report else {
        return TrialResult::no_signal(run_number, seed, wall_ms, return_code);
    };

    let Ok(parsed) = serde_json::from_slice::<SuiteReport>(bytes) else {
        return TrialResult::no_signal(run_number, seed, wall_ms, return_code);
    };

    TrialResult::from_counts(
        run_number,
        seed,
        wall_ms,
        parsed.summary.passed,
        parsed.summary.total,
        return_code,
    )
    .unwrap_or_else(|_| TrialResult::no_signal(run_number, seed, wall_ms, return_code))
}
