//! Logging for kreate runs.
//!
//! There are two layers. Library diagnostics go through `tracing` (every
//! subprocess command is logged at debug) and are set up once per process
//! with [`init_tracing`] or [`init_tracing_with_file`]. Each run also gets a
//! [`RunLogger`] writing `<logs>/<stem>-<timestamp>.log`, with tagged lines,
//! segment progress and per-segment tool stderr tails.
//!
//! ```no_run
//! use kreate_core::logging::{LogOptions, RunLogger, ToolOrigin};
//!
//! let log = RunLogger::to_file("talk-20240102030405", ".logs", LogOptions::default(), None).unwrap();
//! log.step_started("Extract", 4, 6);
//! log.tool_output(ToolOrigin::Segment(1), Some("ffmpeg -ss 0 ..."), ["frame=  250"]);
//! log.segment_done(1, 1, 6);
//! ```

mod run_logger;
mod types;

pub(crate) use run_logger::percent_of;
pub use run_logger::{RunLogger, ToolOrigin};
pub use types::{ConsoleCallback, LogLevel, LogOptions, Tag};

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` when set, else `fallback`.
fn env_filter(fallback: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback.as_filter()))
}

/// Diagnostics to stderr only.
pub fn init_tracing(level: LogLevel) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Diagnostics to stderr and to a daily `kreate.log.<date>` in `logs_dir`.
///
/// Keep the guard alive until exit; dropping it flushes the file writer.
/// When `logs_dir` cannot be created this falls back to [`init_tracing`]
/// and returns `None`.
pub fn init_tracing_with_file(level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = fs::create_dir_all(logs_dir) {
        init_tracing(level);
        tracing::warn!("No diagnostics file, cannot create {}: {}", logs_dir.display(), e);
        return None;
    }

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, "kreate.log"));

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init();

    Some(guard)
}

/// Warnings and up, captured by the test harness.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unusable_logs_dir_falls_back_to_stderr() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        assert!(init_tracing_with_file(LogLevel::Warn, &blocker.join("logs")).is_none());
    }
}
