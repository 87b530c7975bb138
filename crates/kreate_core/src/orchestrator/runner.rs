//! Sets up one run, drives it through a pipeline and always releases the
//! work area afterwards.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;

use crate::config::Settings;
use crate::logging::{ConsoleCallback, LogOptions, RunLogger, Tag};
use crate::media::MediaTool;
use crate::work_area::WorkArea;

use super::errors::{PipelineError, PipelineResult};
use super::types::{Context, JobState, ProgressCallback, RunSpec};
use super::{create_planning_pipeline, create_standard_pipeline};

/// Run timestamp, shared by the work area and every output name.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// How to run a job, beyond what the [`RunSpec`] says.
#[derive(Default)]
pub struct JobOptions {
    /// Probe and plan only.
    pub dry_run: bool,
    /// Use this instead of the current local time.
    pub timestamp: Option<String>,
    /// Receives every run log line as written.
    pub console: Option<ConsoleCallback>,
    pub progress: Option<ProgressCallback>,
}

#[derive(Debug, Clone)]
pub struct JobReport {
    /// `<stem>-<timestamp>`
    pub job_name: String,
    pub state: JobState,
    /// Names of the steps that ran, in order.
    pub steps_completed: Vec<String>,
    pub log_path: Option<PathBuf>,
    /// Set only when the run asked to keep its work area.
    pub kept_work_area: Option<PathBuf>,
}

/// Runs jobs with one set of settings against one media backend.
pub struct JobRunner {
    settings: Settings,
    media: Arc<dyn MediaTool>,
    log_to_file: bool,
}

impl JobRunner {
    pub fn new(settings: Settings, media: Arc<dyn MediaTool>) -> Self {
        Self {
            settings,
            media,
            log_to_file: true,
        }
    }

    /// Log to the console callback only, with no file under `logs_folder`.
    pub fn without_log_file(mut self) -> Self {
        self.log_to_file = false;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one job.
    ///
    /// The work area is gone when this returns, whether the run succeeded
    /// or not, unless `spec.keep_work_area` is set. Files already written
    /// beside the source stay.
    pub fn run(&self, spec: RunSpec, options: JobOptions) -> PipelineResult<JobReport> {
        let timestamp = options
            .timestamp
            .unwrap_or_else(|| Local::now().format(TIMESTAMP_FORMAT).to_string());
        let job_name = format!("{}-{}", spec.stem(), timestamp);
        let paths = &self.settings.paths;

        let logger = self
            .open_log(&job_name, options.console)
            .map(Arc::new)
            .map_err(|e| PipelineError::setup_failed(&job_name, format!("no run log: {}", e)))?;

        let work_dir = PathBuf::from(&paths.work_root).join(WorkArea::dir_name(
            &paths.work_prefix,
            &spec.source,
            &timestamp,
        ));
        let work_area = WorkArea::create(&work_dir)
            .map_err(|e| {
                PipelineError::setup_failed(
                    &job_name,
                    format!("no work area at {}: {}", work_dir.display(), e),
                )
            })?
            .with_manifest_name(&paths.manifest_name);

        logger.note(&format!("job {}", job_name));
        logger.note(&format!("source {}", spec.source.display()));
        logger.note(&format!(
            "start {}s, length {}s, parts of {}s",
            spec.window.start, spec.window.duration, spec.part_duration
        ));
        logger.detail(&format!("work area {}", work_area.path().display()));

        let keep_work_area = spec.keep_work_area;
        let mut ctx = Context::new(
            &job_name,
            spec,
            &timestamp,
            work_area,
            Arc::clone(&self.media),
            Arc::clone(&logger),
        );
        if let Some(callback) = options.progress {
            ctx = ctx.with_progress_callback(callback);
        }

        let pipeline = if options.dry_run {
            create_planning_pipeline()
        } else {
            create_standard_pipeline()
        };
        let mut state = JobState::new(&job_name);
        let outcome = pipeline.run(&ctx, &mut state);

        let work_area = ctx.into_work_area();
        let kept_work_area = if keep_work_area {
            let path = work_area.keep();
            logger.note(&format!("work area kept at {}", path.display()));
            Some(path)
        } else {
            if let Err(e) = work_area.cleanup() {
                logger.warn(&format!("work area not removed: {}", e));
            }
            None
        };

        let result = match outcome {
            Ok(steps_completed) => {
                if let Some(path) = state.best_output() {
                    logger.line(Tag::Done, &format!("highlights in {}", path.display()));
                }
                Ok(JobReport {
                    job_name,
                    state,
                    steps_completed,
                    log_path: logger.log_path().map(PathBuf::from),
                    kept_work_area,
                })
            }
            Err(e) => {
                logger.fail(&e.to_string());
                Err(e)
            }
        };
        logger.flush();
        result
    }

    fn open_log(&self, job_name: &str, console: Option<ConsoleCallback>) -> io::Result<RunLogger> {
        let options = LogOptions::from_settings(&self.settings.logging);
        if self.log_to_file {
            RunLogger::to_file(job_name, &self.settings.paths.logs_folder, options, console)
        } else {
            Ok(RunLogger::console_only(options, console))
        }
    }
}

/// Run one job with default [`JobOptions`].
pub fn run_job(
    spec: RunSpec,
    settings: &Settings,
    media: Arc<dyn MediaTool>,
) -> PipelineResult<JobReport> {
    JobRunner::new(settings.clone(), media).run(spec, JobOptions::default())
}
