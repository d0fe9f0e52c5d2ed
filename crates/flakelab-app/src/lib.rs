//! Application layer for flakelab.
//!
//! The app layer coordinates adapters and domain logic.
//! It does not parse CLI flags and it does not do filesystem I/O.

mod analyze;
mod collect;
mod report;

pub use analyze::{AnalyzeError, AnalyzeRequest, AnalyzeStudyUseCase, TrialBatch};
pub use collect::{CollectOutcome, CollectRequest, CollectTrialsUseCase, SeedMode};
pub use report::render_markdown;

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

pub(crate) fn host_info() -> flakelab_types::HostInfo {
    flakelab_types::HostInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}
