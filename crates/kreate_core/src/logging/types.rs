//! Levels, line tags and options for run logs.

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Severity of a log line, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// What produced a run log line.
///
/// Every tag maps to one level and one short marker, so a run log can be
/// grepped by marker (`grep ' tool '`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// A pipeline step starting.
    Step,
    /// A pipeline step finishing.
    Done,
    /// An ffmpeg/ffprobe command line.
    Tool,
    /// A line of tool stderr.
    Stderr,
    /// Per-segment extraction progress.
    Segment,
    Note,
    Detail,
    Warn,
    Fail,
}

impl Tag {
    pub fn level(self) -> LogLevel {
        match self {
            Tag::Detail => LogLevel::Debug,
            Tag::Warn => LogLevel::Warn,
            Tag::Fail => LogLevel::Error,
            Tag::Step | Tag::Done | Tag::Tool | Tag::Stderr | Tag::Segment | Tag::Note => {
                LogLevel::Info
            }
        }
    }

    /// Fixed-width marker written before the message.
    pub fn marker(self) -> &'static str {
        match self {
            Tag::Step => "step",
            Tag::Done => "done",
            Tag::Tool => "tool",
            Tag::Stderr => " err",
            Tag::Segment => " seg",
            Tag::Note => "    ",
            Tag::Detail => "  ..",
            Tag::Warn => "WARN",
            Tag::Fail => "FAIL",
        }
    }
}

/// Options for one [`RunLogger`](super::RunLogger).
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Throttle segment progress and keep tool stderr out of the log
    /// until something fails.
    pub compact: bool,
    /// In compact mode, report segment progress every this many percent.
    pub progress_step: u32,
    /// Stderr lines kept per tool origin for failure reports.
    pub tail_lines: usize,
    /// Prefix lines with the wall-clock time.
    pub timestamps: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }
}

impl LogOptions {
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            compact: settings.compact,
            progress_step: settings.progress_step.clamp(1, 100),
            tail_lines: settings.error_tail as usize,
            timestamps: settings.show_timestamps,
        }
    }
}

/// Receives every rendered run log line, e.g. to echo it on a terminal.
pub type ConsoleCallback = Box<dyn Fn(&str) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_directives_match_levels() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::default().as_filter(), "info");
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn progress_step_is_kept_in_range() {
        let mut settings = LoggingSettings {
            progress_step: 0,
            ..LoggingSettings::default()
        };
        assert_eq!(LogOptions::from_settings(&settings).progress_step, 1);

        settings.progress_step = 250;
        assert_eq!(LogOptions::from_settings(&settings).progress_step, 100);
    }

    #[test]
    fn markers_share_one_width() {
        let tags = [
            Tag::Step,
            Tag::Done,
            Tag::Tool,
            Tag::Stderr,
            Tag::Segment,
            Tag::Note,
            Tag::Detail,
            Tag::Warn,
            Tag::Fail,
        ];
        assert!(tags.iter().all(|t| t.marker().len() == 4));
        assert_eq!(Tag::Detail.level(), LogLevel::Debug);
        assert_eq!(Tag::Fail.level(), LogLevel::Error);
    }
}
