//! Archive run orchestration.

mod pipeline;

pub use pipeline::{ArchiveOutcome, ProgressReporter, SilentProgress, run_archive};
