//! Runs a job as a sequence of steps.
//!
//! Each step checks its inputs, does its work, records it in the shared
//! [`JobState`] and checks what it recorded.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: HeadTrim   first N seconds, beside the source
//!     ├── Step: Probe      source duration
//!     ├── Step: Plan       segment positions
//!     ├── Step: Extract    <index>.<ext> per segment, in the work area
//!     ├── Step: Manifest   ordered concat list
//!     └── Step: Concat     <stem>-best-<timestamp>.<ext>
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kreate_core::config::Settings;
//! use kreate_core::media::FfmpegTool;
//! use kreate_core::orchestrator::{run_job, RunSpec};
//!
//! let settings = Settings::default();
//! let spec = RunSpec::from_settings("talk.mp4", &settings);
//! let report = run_job(spec, &settings, Arc::new(FfmpegTool::new())).unwrap();
//! println!("Completed: {:?}", report.steps_completed);
//! ```

mod errors;
mod pipeline;
mod runner;
mod step;
pub mod steps;
#[cfg(test)]
mod test_support;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::Pipeline;
pub use runner::{run_job, JobOptions, JobReport, JobRunner, TIMESTAMP_FORMAT};
pub use step::PipelineStep;
pub use steps::{ConcatStep, ExtractStep, HeadTrimStep, ManifestStep, PlanStep, ProbeStep};
pub use types::{
    ConcatOutput, Context, ExtractOutput, HeadTrimOutput, JobState, ManifestOutput, ProbeOutput,
    ProgressCallback, RunSpec,
};

/// Every step of a full run, in order.
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(HeadTrimStep::new())
        .with_step(ProbeStep::new())
        .with_step(PlanStep::new())
        .with_step(ExtractStep::new())
        .with_step(ManifestStep::new())
        .with_step(ConcatStep::new())
}

/// Probe and plan only, for dry runs.
pub fn create_planning_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(ProbeStep::new())
        .with_step(PlanStep::new())
}
