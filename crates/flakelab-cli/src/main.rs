use anyhow::Context;
use clap::{Parser, Subcommand};
use flakelab_adapters::StdSuiteRunner;
use flakelab_app::{
    AnalyzeRequest, AnalyzeStudyUseCase, Clock, CollectRequest, CollectTrialsUseCase, SeedMode,
    SystemClock, TrialBatch, render_markdown,
};
use flakelab_domain::{CostModel, ScoreWeights};
use flakelab_types::{
    ConfigFile, HostInfo, Severity, StudyMeta, StudyReceipt, ToolInfo, TrialsReceipt,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "flakelab",
    version,
    about = "Flaky-test studies: collect trials, classify flakiness, rank mitigations"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one suite configuration repeatedly and emit a trials receipt (JSON).
    Collect {
        /// Configuration identifier (archetype name, "all_flaky", strategy name, ...)
        #[arg(long)]
        name: String,

        /// Marker expression recorded in the receipt
        #[arg(long)]
        markers: Option<String>,

        /// Runs per seed
        #[arg(long, default_value_t = 30)]
        runs: u32,

        /// Seed (repeatable; defaults to 42, 123, 999)
        #[arg(long = "seed")]
        seeds: Vec<u64>,

        /// Derive a fresh seed per run (seed * 1000 + run) instead of a fixed one
        #[arg(long, default_value_t = false)]
        per_run_seed: bool,

        /// Working directory
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Per-run timeout (e.g. "30s")
        #[arg(long)]
        timeout: Option<String>,

        /// Environment variable (KEY=VALUE). Repeatable.
        #[arg(long, value_parser = parse_key_val_string)]
        env: Vec<(String, String)>,

        /// Max bytes captured from stdout/stderr per run
        #[arg(long, default_value_t = 8192)]
        output_cap_bytes: usize,

        /// Report file the suite writes each run (JSON with a "summary" object)
        #[arg(long)]
        report_file: Option<PathBuf>,

        /// Load suite command and defaults from a TOML config instead of argv
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file path
        #[arg(long, default_value = "flakelab-trials.json")]
        out: PathBuf,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Suite command (argv) after `--`
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Analyze collected baseline and strategy receipts into a study receipt (JSON).
    Analyze {
        /// Baseline trials receipt, NAME=PATH. Repeatable.
        #[arg(long = "baseline", value_parser = parse_key_val_string, required = true)]
        baselines: Vec<(String, String)>,

        /// Mitigation-strategy trials receipt, NAME=PATH. Repeatable.
        #[arg(long = "strategy", value_parser = parse_key_val_string)]
        strategies: Vec<(String, String)>,

        /// Baseline configuration strategies are scored against
        #[arg(long, default_value = "all_flaky")]
        baseline_key: String,

        /// Weight of pass-rate improvement in the effectiveness score
        #[arg(long, default_value_t = 0.7)]
        improvement_weight: f64,

        /// Weight of the time-overhead penalty in the effectiveness score
        #[arg(long, default_value_t = 0.3)]
        overhead_weight: f64,

        /// Exit nonzero when any archetype classifies as severe
        #[arg(long, default_value_t = false)]
        fail_on_severe: bool,

        /// Output study receipt
        #[arg(long, default_value = "flakelab-study.json")]
        out: PathBuf,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Render a Markdown summary from a study receipt.
    Md {
        #[arg(long)]
        study: PathBuf,

        /// Output markdown path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    if let Err(err) = real_main() {
        eprintln!("{err:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Collect {
            name,
            markers,
            runs,
            seeds,
            per_run_seed,
            cwd,
            timeout,
            env,
            output_cap_bytes,
            report_file,
            config,
            out,
            pretty,
            command,
        } => {
            let req = build_collect_request(
                name,
                markers,
                runs,
                seeds,
                per_run_seed,
                cwd,
                timeout,
                env,
                output_cap_bytes,
                report_file,
                config.as_deref(),
                command,
            )?;

            let usecase = CollectTrialsUseCase::new(StdSuiteRunner, SystemClock, tool_info());
            let outcome = usecase.execute(req)?;

            for reason in &outcome.reasons {
                eprintln!("warning: {reason}");
            }

            let stats = &outcome.receipt.stats;
            println!(
                "{}: {} runs, {} valid, avg pass rate {:.1}%, flakiness index {:.3}",
                outcome.receipt.suite.name,
                stats.total_runs,
                stats.valid_runs,
                stats.avg_pass_rate * 100.0,
                stats.flakiness_index,
            );

            write_json(&out, &outcome.receipt, pretty)?;
            Ok(())
        }

        Command::Analyze {
            baselines,
            strategies,
            baseline_key,
            improvement_weight,
            overhead_weight,
            fail_on_severe,
            out,
            pretty,
        } => {
            let baseline = load_batches(&baselines)?;
            let mitigation = load_batches(&strategies)?;

            let now = SystemClock.now_rfc3339();

            let receipt = AnalyzeStudyUseCase::execute(AnalyzeRequest {
                baseline,
                mitigation,
                baseline_key,
                weights: ScoreWeights {
                    improvement: improvement_weight,
                    overhead: overhead_weight,
                },
                cost_model: CostModel::default(),
                tool: tool_info(),
                study: StudyMeta {
                    id: uuid::Uuid::new_v4().to_string(),
                    started_at: now.clone(),
                    ended_at: now,
                    host: HostInfo {
                        os: std::env::consts::OS.to_string(),
                        arch: std::env::consts::ARCH.to_string(),
                    },
                },
            })?;

            write_json(&out, &receipt, pretty)?;

            let severe: Vec<String> = receipt
                .flakiness
                .iter()
                .filter(|(_, a)| a.severity == Severity::Severe)
                .map(|(archetype, _)| archetype.to_string())
                .collect();

            if !severe.is_empty() {
                eprintln!("severe flakiness: {}", severe.join(", "));
                if fail_on_severe {
                    std::process::exit(2);
                }
            }

            Ok(())
        }

        Command::Md { study, out } => {
            let receipt: StudyReceipt = read_json(&study)?;
            let md = render_markdown(&receipt);

            match out {
                Some(path) => {
                    fs::write(&path, md).with_context(|| format!("write {}", path.display()))?;
                }
                None => {
                    print!("{md}");
                }
            }

            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_collect_request(
    name: String,
    markers: Option<String>,
    runs: u32,
    seeds: Vec<u64>,
    per_run_seed: bool,
    cwd: Option<PathBuf>,
    timeout: Option<String>,
    env: Vec<(String, String)>,
    output_cap_bytes: usize,
    report_file: Option<PathBuf>,
    config: Option<&Path>,
    command: Vec<String>,
) -> anyhow::Result<CollectRequest> {
    let mut markers = markers;
    let mut runs = runs;
    let mut seeds = seeds;
    let mut per_run_seed = per_run_seed;
    let mut cwd = cwd;
    let mut timeout = timeout;
    let mut command = command;

    if let Some(path) = config {
        let cfg = read_config(path)?;

        let suite = cfg
            .suites
            .iter()
            .find(|s| s.name == name)
            .with_context(|| format!("suite {name:?} not found in {}", path.display()))?;

        command = suite.command.clone();
        markers = markers.or_else(|| suite.markers.clone());
        per_run_seed = per_run_seed || suite.per_run_seed;
        if cwd.is_none() {
            cwd = suite.cwd.clone().map(PathBuf::from);
        }
        if let Some(r) = suite.runs.or(cfg.defaults.runs) {
            runs = r;
        }
        if seeds.is_empty() {
            seeds = cfg.defaults.seeds.clone().unwrap_or_default();
        }
        if timeout.is_none() {
            timeout = suite.timeout.clone().or_else(|| cfg.defaults.timeout.clone());
        }
    }

    if command.is_empty() {
        anyhow::bail!("no suite command: pass one after `--` or use --config with a suite");
    }

    if seeds.is_empty() {
        seeds = vec![42, 123, 999];
    }

    let timeout = timeout.as_deref().map(parse_duration).transpose()?;

    Ok(CollectRequest {
        name,
        markers,
        command,
        cwd,
        runs,
        seeds,
        seed_mode: if per_run_seed {
            SeedMode::PerRun
        } else {
            SeedMode::Fixed
        },
        timeout,
        env,
        output_cap_bytes,
        report_file,
    })
}

fn load_batches(named: &[(String, String)]) -> anyhow::Result<BTreeMap<String, TrialBatch>> {
    let mut batches = BTreeMap::new();
    for (name, path) in named {
        let receipt: TrialsReceipt = read_json(Path::new(path))?;
        batches.insert(
            name.clone(),
            TrialBatch::new(receipt.trials, receipt.stats.duration_ms),
        );
    }
    Ok(batches)
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "flakelab".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let d = humantime::parse_duration(s).with_context(|| format!("invalid duration: {s}"))?;
    Ok(d)
}

fn parse_key_val_string(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| "expected KEY=VALUE".to_string())?;
    Ok((k.to_string(), v.to_string()))
}

fn read_config(path: &Path) -> anyhow::Result<ConfigFile> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg =
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }

    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    atomic_write(path, &bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = parent.to_path_buf();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
