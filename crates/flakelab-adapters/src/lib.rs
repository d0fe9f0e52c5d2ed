//! Std adapters for flakelab.
//!
//! In clean-arch terms: this is where we touch the world. The collect
//! use case drives a [`SuiteRunner`]; the std implementation spawns the
//! suite command, enforces the timeout, caps captured output, and picks up
//! the machine-readable report file the suite wrote (if any).

use anyhow::Context;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SuiteSpec {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub output_cap_bytes: usize,

    /// Path where the suite writes its machine-readable summary.
    /// Removed before the run, read back after it.
    pub report_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SuiteRun {
    pub wall_ms: u64,
    pub exit_code: i32,
    pub timed_out: bool,

    /// Bytes of the report file, when the suite produced one.
    pub report: Option<Vec<u8>>,

    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("suite argv must not be empty")]
    EmptyArgv,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub trait SuiteRunner {
    fn run(&self, spec: &SuiteSpec) -> Result<SuiteRun, AdapterError>;
}

#[derive(Debug, Default, Clone)]
pub struct StdSuiteRunner;

impl SuiteRunner for StdSuiteRunner {
    fn run(&self, spec: &SuiteSpec) -> Result<SuiteRun, AdapterError> {
        if spec.argv.is_empty() {
            return Err(AdapterError::EmptyArgv);
        }

        // A stale report from a previous run must not be mistaken for this
        // run's signal.
        if let Some(report) = &spec.report_file {
            let _ = std::fs::remove_file(report);
        }

        let start = Instant::now();

        let mut cmd = Command::new(&spec.argv[0]);
        if spec.argv.len() > 1 {
            cmd.args(&spec.argv[1..]);
        }

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        for (k, v) in &spec.env {
            cmd.env(k, v);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn suite {:?}", spec.argv))?;

        let mut child_stdout = child.stdout.take();
        let mut child_stderr = child.stderr.take();

        let cap = spec.output_cap_bytes;

        let out_handle = thread::spawn(move || match child_stdout.as_mut() {
            Some(r) => read_with_cap(r, cap),
            None => Vec::new(),
        });
        let err_handle = thread::spawn(move || match child_stderr.as_mut() {
            Some(r) => read_with_cap(r, cap),
            None => Vec::new(),
        });

        let (status, timed_out) = wait_with_timeout(&mut child, spec.timeout)?;

        let stdout = out_handle.join().unwrap_or_default();
        let stderr = err_handle.join().unwrap_or_default();

        let wall_ms = start.elapsed().as_millis() as u64;
        let exit_code = status.code().unwrap_or(-1);

        let report = spec
            .report_file
            .as_ref()
            .and_then(|p| std::fs::read(p).ok());

        Ok(SuiteRun {
            wall_ms,
            exit_code,
            timed_out,
            report,
            stdout,
            stderr,
        })
    }
}

fn wait_with_timeout(
    child: &mut std::process::Child,
    timeout: Option<Duration>,
) -> Result<(std::process::ExitStatus, bool), AdapterError> {
    let Some(timeout) = timeout else {
        let status = child.wait().context("wait on suite process")?;
        return Ok((status, false));
    };

    let start = Instant::now();

    loop {
        if let Some(status) = child.try_wait().context("poll suite process")? {
            return Ok((status, false));
        }

        if start.elapsed() >= timeout {
            child.kill().context("kill timed-out suite process")?;
            let status = child.wait().context("reap killed suite process")?;
            return Ok((status, true));
        }

        thread::sleep(Duration::from_millis(10));
    }
}

fn read_with_cap<R: Read>(reader: &mut R, cap: usize) -> Vec<u8> {
    let mut buf: Vec<u8> = Vec::new();
    let mut tmp = [0u8; 8192];

    loop {
        match reader.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() < cap {
                    let remaining = cap - buf.len();
                    let take = remaining.min(n);
                    buf.extend_from_slice(&tmp[..take]);
                }
            }
            Err(_) => break,
        }
    }

    buf
}
