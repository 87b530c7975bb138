//! What a run is asked to do, what steps can read, and what they record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::logging::RunLogger;
use crate::media::MediaTool;
use crate::planning::{OverrunPolicy, SegmentPlan, TrimWindow};
use crate::timecode::{self, TimecodeResult};
use crate::work_area::WorkArea;

/// Called with `(stage, percent, message)` as a run advances.
///
/// Stages are step names, plus `"Extract"` once per finished segment.
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// What one run should do, resolved from flags and config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Source video.
    pub source: PathBuf,
    /// Where sampling starts and how long the highlight clip is.
    pub window: TrimWindow,
    /// Length of each sampled segment, in seconds.
    pub part_duration: f64,
    pub overrun_policy: OverrunPolicy,
    /// Extract segments concurrently.
    pub parallel: bool,
    /// Concurrent extraction limit (0 = one per CPU).
    pub max_jobs: usize,
    /// Leave the work area on disk after the run.
    pub keep_work_area: bool,
}

impl RunSpec {
    /// Run request for `source` using only configured defaults.
    pub fn from_settings(source: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            source: source.into(),
            window: TrimWindow::new(settings.trim.start, settings.trim.duration),
            part_duration: settings.trim.part_duration,
            overrun_policy: settings.planner.overrun_policy,
            parallel: settings.run.parallel,
            max_jobs: settings.run.max_jobs,
            keep_work_area: settings.run.keep_work_area,
        }
    }

    /// Override the trim window from raw user strings.
    ///
    /// `None` keeps the current value.
    pub fn with_raw_window(
        mut self,
        start: Option<&str>,
        duration: Option<&str>,
        part: Option<&str>,
    ) -> TimecodeResult<Self> {
        if let Some(raw) = start {
            self.window.start = timecode::parse_seconds(raw)?;
        }
        if let Some(raw) = duration {
            self.window.duration = timecode::parse_seconds(raw)?;
        }
        if let Some(raw) = part {
            self.part_duration = timecode::parse_seconds(raw)?;
        }
        Ok(self)
    }

    /// Source file stem, used in output and work area names.
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string())
    }

    /// Source extension, shared by every segment and output.
    pub fn extension(&self) -> Option<String> {
        self.source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
    }

    /// Output path beside the source: `<stem>-<label>-<timestamp>.<ext>`.
    pub fn output_path(&self, label: &str, timestamp: &str) -> PathBuf {
        let name = match self.extension() {
            Some(ext) => format!("{}-{}-{}.{}", self.stem(), label, timestamp, ext),
            None => format!("{}-{}-{}", self.stem(), label, timestamp),
        };
        match self.source.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
            _ => PathBuf::from(name),
        }
    }
}

/// Everything a step may read. Step results go into [`JobState`] instead.
pub struct Context {
    /// Job name (`<stem>-<timestamp>`), used in logs and errors.
    pub job_name: String,
    /// What to produce.
    pub spec: RunSpec,
    /// Run timestamp, computed once and shared by every output name.
    pub timestamp: String,
    /// Scratch directory for segment files and the manifest.
    pub work_area: WorkArea,
    pub media: Arc<dyn MediaTool>,
    pub logger: Arc<RunLogger>,
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    pub fn new(
        job_name: impl Into<String>,
        spec: RunSpec,
        timestamp: impl Into<String>,
        work_area: WorkArea,
        media: Arc<dyn MediaTool>,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            spec,
            timestamp: timestamp.into(),
            work_area,
            media,
            logger,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn report_progress(&self, stage: &str, percent: u32, message: &str) {
        if let Some(callback) = self.progress_callback.as_ref() {
            callback(stage, percent.min(100), message);
        }
    }

    pub fn source(&self) -> &Path {
        &self.spec.source
    }

    /// Path of the "first N seconds" output.
    pub fn head_output_path(&self) -> PathBuf {
        self.spec.output_path("first", &self.timestamp)
    }

    /// Path of the reassembled highlights output.
    pub fn best_output_path(&self) -> PathBuf {
        self.spec.output_path("best", &self.timestamp)
    }

    /// Give up the context, keeping the work area for release.
    pub fn into_work_area(self) -> WorkArea {
        self.work_area
    }
}

/// What the steps of one run recorded, one section per step.
///
/// Each section is written once by its own step. The whole record can be
/// dumped as JSON (`kreate --json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobState {
    /// `<stem>-<timestamp>`
    pub job_id: String,
    /// RFC 3339 local time.
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_trim: Option<HeadTrimOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<SegmentPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concat: Option<ConcatOutput>,
}

impl JobState {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Probed source duration, once known.
    pub fn source_duration(&self) -> Option<f64> {
        self.probe.as_ref().map(|p| p.duration_seconds)
    }

    /// Final highlights file, once reassembled.
    pub fn best_output(&self) -> Option<&Path> {
        self.concat.as_ref().map(|c| c.output_path.as_path())
    }

    /// Head trim file, once written.
    pub fn head_output(&self) -> Option<&Path> {
        self.head_trim.as_ref().map(|h| h.output_path.as_path())
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Output from the HeadTrim step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadTrimOutput {
    pub output_path: PathBuf,
    /// Length that was requested, formatted as passed to the tool.
    pub duration: String,
    pub command: String,
}

/// Output from the Probe step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProbeOutput {
    pub duration_seconds: f64,
}

/// Output from the Extract step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractOutput {
    /// Segment index → produced file.
    pub segments: BTreeMap<usize, PathBuf>,
    /// Whether segments were extracted concurrently.
    pub parallel: bool,
}

/// Output from the Manifest step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestOutput {
    pub manifest_path: PathBuf,
    /// Listed segment files, in concat order.
    pub entries: Vec<PathBuf>,
}

/// Output from the Concat step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatOutput {
    pub output_path: PathBuf,
    pub command: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_spec_names_outputs_beside_source() {
        let spec = RunSpec::from_settings("/videos/talk.mp4", &Settings::default());
        assert_eq!(
            spec.output_path("best", "20240102030405"),
            PathBuf::from("/videos/talk-best-20240102030405.mp4")
        );
        assert_eq!(spec.extension().as_deref(), Some("mp4"));
    }

    #[test]
    fn run_spec_without_directory_or_extension() {
        let spec = RunSpec::from_settings("clip", &Settings::default());
        assert_eq!(
            spec.output_path("first", "1"),
            PathBuf::from("clip-first-1")
        );
    }

    #[test]
    fn raw_window_overrides_defaults() {
        let spec = RunSpec::from_settings("a.mp4", &Settings::default())
            .with_raw_window(Some("5"), None, Some(" 2.5 "))
            .unwrap();
        assert_eq!(spec.window.start, 5.0);
        assert_eq!(spec.window.duration, 60.0);
        assert_eq!(spec.part_duration, 2.5);

        let err = RunSpec::from_settings("a.mp4", &Settings::default())
            .with_raw_window(None, Some("ten"), None);
        assert!(err.is_err());
    }

    #[test]
    fn job_state_serializes() {
        let mut state = JobState::new("talk-456");
        state.probe = Some(ProbeOutput {
            duration_seconds: 300.0,
        });
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"job_id\":\"talk-456\""));
        assert!(json.contains("\"duration_seconds\":300.0"));
        assert!(!json.contains("concat"));
        assert_eq!(state.source_duration(), Some(300.0));
    }
}
