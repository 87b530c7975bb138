//! Everything `kreate.toml` can set, one struct per table.
//!
//! Each table is `#[serde(default)]`, so a file only needs the keys it
//! changes.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::planning::OverrunPolicy;
use crate::work_area::{DEFAULT_MANIFEST_NAME, DEFAULT_WORK_PREFIX};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub logging: LoggingSettings,
    pub trim: TrimSettings,
    pub planner: PlannerSettings,
    pub tools: ToolSettings,
    pub run: RunSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Work areas are created under this directory.
    pub work_root: String,
    /// Work areas are named `<prefix>-<stem>-<timestamp>`.
    pub work_prefix: String,
    /// Concat list inside the work area. Never mistaken for a segment.
    pub manifest_name: String,
    /// Run logs and the daily diagnostics file.
    pub logs_folder: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_root: ".".into(),
            work_prefix: DEFAULT_WORK_PREFIX.into(),
            manifest_name: DEFAULT_MANIFEST_NAME.into(),
            logs_folder: ".logs".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    /// Hide tool stderr unless something fails, and throttle segment
    /// progress to every `progress_step` percent.
    pub compact: bool,
    /// Stderr lines kept per tool call for failure reports.
    pub error_tail: u32,
    pub progress_step: u32,
    pub show_timestamps: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: 20,
            progress_step: 20,
            show_timestamps: true,
        }
    }
}

/// Trim window used when no flag overrides it. All values in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimSettings {
    pub start: f64,
    /// Length of the highlights clip, and of the head trim.
    pub duration: f64,
    pub part_duration: f64,
}

impl Default for TrimSettings {
    fn default() -> Self {
        Self {
            start: 0.0,
            duration: 60.0,
            part_duration: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub overrun_policy: OverrunPolicy,
}

/// Executables to run, by name on `PATH` or by full path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub parallel: bool,
    /// Most extractions at once when `parallel`; 0 means one per CPU.
    pub max_jobs: usize,
    pub keep_work_area: bool,
}

/// The tables of `kreate.toml`, for writing one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Trim,
    Planner,
    Tools,
    Run,
}

impl ConfigSection {
    /// In the order they are written.
    pub const ALL: [ConfigSection; 6] = [
        Self::Paths,
        Self::Logging,
        Self::Trim,
        Self::Planner,
        Self::Tools,
        Self::Run,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            Self::Paths => "paths",
            Self::Logging => "logging",
            Self::Trim => "trim",
            Self::Planner => "planner",
            Self::Tools => "tools",
            Self::Run => "run",
        }
    }

    /// Written above the table in a generated file.
    pub fn comment(self) -> &'static str {
        match self {
            Self::Paths => "# Work area and log locations",
            Self::Logging => "# Run log (level: trace | debug | info | warn | error)",
            Self::Trim => "# Default trim window (seconds)",
            Self::Planner => "# Segment planner (overrun_policy: reject | clamp | drop)",
            Self::Tools => "# External media tools",
            Self::Run => "# Extraction (max_jobs 0 = one per CPU)",
        }
    }
}
