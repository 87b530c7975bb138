//! Test doubles for pipeline tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::config::Settings;
use crate::logging::{ConsoleCallback, LogOptions, RunLogger};
use crate::media::{MediaError, MediaResult, MediaTool, ToolOutput, TrimRequest};
use crate::work_area::WorkArea;

use super::types::{Context, RunSpec};

#[derive(Default)]
struct Calls {
    trims: Vec<TrimRequest>,
    concats: Vec<(PathBuf, PathBuf)>,
}

/// Media tool that writes placeholder files instead of running ffmpeg.
#[derive(Clone)]
pub struct FakeMedia {
    duration: f64,
    fail_probe: bool,
    fail_output: Option<String>,
    calls: Arc<Mutex<Calls>>,
}

impl FakeMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            fail_probe: false,
            fail_output: None,
            calls: Arc::new(Mutex::new(Calls::default())),
        }
    }

    /// Fail any trim or concat whose output path contains `needle`.
    pub fn failing_on_output(mut self, needle: &str) -> Self {
        self.fail_output = Some(needle.to_string());
        self
    }

    pub fn failing_probe(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    pub fn trims(&self) -> Vec<TrimRequest> {
        self.calls.lock().trims.clone()
    }

    pub fn concats(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().concats.clone()
    }

    fn check(&self, output: &Path) -> MediaResult<()> {
        match self.fail_output {
            Some(ref needle) if output.to_string_lossy().contains(needle.as_str()) => {
                Err(MediaError::CommandFailed {
                    tool: "fake".to_string(),
                    exit_code: 1,
                    message: format!("cannot write {}", output.display()),
                })
            }
            _ => Ok(()),
        }
    }
}

impl MediaTool for FakeMedia {
    fn name(&self) -> &str {
        "fake"
    }

    fn probe_duration(&self, _source: &Path) -> MediaResult<f64> {
        if self.fail_probe {
            return Err(MediaError::InvalidOutput {
                tool: "fake".to_string(),
                message: "N/A".to_string(),
            });
        }
        Ok(self.duration)
    }

    fn trim(&self, request: &TrimRequest) -> MediaResult<ToolOutput> {
        self.calls.lock().trims.push(request.clone());
        self.check(&request.output)?;
        fs::write(
            &request.output,
            format!("{} +{}", request.start, request.duration),
        )
        .map_err(|e| MediaError::Spawn {
            tool: "fake".to_string(),
            source: e,
        })?;
        Ok(ToolOutput {
            command: format!("fake trim {}", request.output.display()),
            stderr_lines: Vec::new(),
        })
    }

    fn concat(&self, manifest: &Path, output: &Path) -> MediaResult<ToolOutput> {
        self.calls
            .lock()
            .concats
            .push((manifest.to_path_buf(), output.to_path_buf()));
        self.check(output)?;
        fs::copy(manifest, output).map_err(|e| MediaError::Spawn {
            tool: "fake".to_string(),
            source: e,
        })?;
        Ok(ToolOutput::default())
    }
}

/// Context over a fresh temp dir holding an empty `talk.mp4` source.
pub fn context_for(media: FakeMedia, adjust: impl FnOnce(&mut RunSpec)) -> (Context, TempDir) {
    build_context(media, adjust, RunLogger::console_only(LogOptions::default(), None))
}

pub fn test_context() -> (Context, TempDir) {
    context_for(FakeMedia::new(300.0), |_| {})
}

/// Like [`test_context`], with every run log line captured.
pub fn captured_context() -> (Context, Arc<Mutex<Vec<String>>>, TempDir) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let console: ConsoleCallback = Box::new(move |line: &str| sink.lock().push(line.to_string()));
    let options = LogOptions {
        timestamps: false,
        ..LogOptions::default()
    };
    let (ctx, dir) = build_context(
        FakeMedia::new(300.0),
        |_| {},
        RunLogger::console_only(options, Some(console)),
    );
    (ctx, lines, dir)
}

fn build_context(
    media: FakeMedia,
    adjust: impl FnOnce(&mut RunSpec),
    logger: RunLogger,
) -> (Context, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("talk.mp4");
    fs::write(&source, b"").unwrap();

    let settings = Settings::default();
    let mut spec = RunSpec::from_settings(&source, &settings);
    adjust(&mut spec);

    let timestamp = "20240102030405";
    let work_area = WorkArea::create(dir.path().join(WorkArea::dir_name(
        &settings.paths.work_prefix,
        &source,
        timestamp,
    )))
    .unwrap();

    let ctx = Context::new(
        "talk-20240102030405",
        spec,
        timestamp,
        work_area,
        Arc::new(media),
        Arc::new(logger),
    );
    (ctx, dir)
}
