//! Errors raised while running a job.
//!
//! A [`StepError`] says what went wrong inside one step. The pipeline wraps
//! it in a [`PipelineError`] naming the job and the step, which is what the
//! CLI prints.

use std::io;

use thiserror::Error;

use crate::logging::ToolOrigin;
use crate::manifest::ManifestError;
use crate::media::MediaError;
use crate::planning::PlanError;
use crate::timecode::TimecodeError;

pub type StepResult<T> = Result<T, StepError>;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Job '{job_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The work area or the run log could not be created; no step ran.
    #[error("Job '{job_name}' could not start: {message}")]
    SetupFailed { job_name: String, message: String },
}

impl PipelineError {
    pub fn step_failed(job_name: &str, step_name: &str, source: StepError) -> Self {
        Self::StepFailed {
            job_name: job_name.to_string(),
            step_name: step_name.to_string(),
            source,
        }
    }

    pub fn setup_failed(job_name: &str, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.to_string(),
            message: message.into(),
        }
    }

    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            Self::SetupFailed { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum StepError {
    /// A time value was negative, not finite or past the accepted ceiling.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// No segment plan fits this window and source.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Probe failed: {source}")]
    ProbeFailed {
        #[source]
        source: MediaError,
    },

    #[error("Head trim failed: {source}")]
    TrimHeadFailed {
        #[source]
        source: MediaError,
    },

    #[error("Extraction of segment {index} failed: {source}")]
    ExtractionFailed {
        index: usize,
        #[source]
        source: MediaError,
    },

    /// The work area's segment files disagree with the plan.
    #[error("Manifest corrupt: {0}")]
    ManifestCorrupt(String),

    #[error("Reassembly failed: {source}")]
    ReassemblyFailed {
        #[source]
        source: MediaError,
    },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot start extraction threads: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Missing input: {0}")]
    InvalidInput(String),

    #[error("Bad output: {0}")]
    InvalidOutput(String),
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn manifest_corrupt(message: impl Into<String>) -> Self {
        Self::ManifestCorrupt(message.into())
    }

    pub fn extraction_failed(index: usize, source: MediaError) -> Self {
        Self::ExtractionFailed { index, source }
    }

    /// Which tool call's stderr tail explains this error.
    pub fn origin(&self) -> ToolOrigin {
        match self {
            Self::ExtractionFailed { index, .. } => ToolOrigin::Segment(*index),
            _ => ToolOrigin::Run,
        }
    }
}

impl From<TimecodeError> for StepError {
    fn from(err: TimecodeError) -> Self {
        let TimecodeError::InvalidDuration(value) = err;
        Self::InvalidDuration(value)
    }
}

impl From<PlanError> for StepError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::InvalidDuration(inner) => inner.into(),
            PlanError::InvalidPlan(message) => Self::InvalidPlan(message),
        }
    }
}

impl From<ManifestError> for StepError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Corrupt(message) => Self::ManifestCorrupt(message),
            ManifestError::Io { operation, source } => Self::Io { operation, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_failure(message: &str) -> MediaError {
        MediaError::CommandFailed {
            tool: "ffmpeg".to_string(),
            exit_code: 1,
            message: message.to_string(),
        }
    }

    #[test]
    fn extraction_error_blames_its_segment() {
        let err = StepError::extraction_failed(3, tool_failure("moov atom not found"));
        let msg = err.to_string();
        assert!(msg.contains("segment 3"));
        assert!(msg.contains("exit code 1"));
        assert_eq!(err.origin(), ToolOrigin::Segment(3));

        let err = StepError::ReassemblyFailed {
            source: tool_failure("Invalid data"),
        };
        assert_eq!(err.origin(), ToolOrigin::Run);
    }

    #[test]
    fn step_failure_names_job_and_step() {
        let step_err = StepError::InvalidPlan("segment 6 ends at 310.000".to_string());
        let pipeline_err = PipelineError::step_failed("talk-20240102030405", "Plan", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("talk-20240102030405"));
        assert!(msg.contains("'Plan'"));
        assert!(matches!(
            pipeline_err.step_error(),
            Some(StepError::InvalidPlan(_))
        ));
        assert!(PipelineError::setup_failed("x", "disk full").step_error().is_none());
    }

    #[test]
    fn lower_layer_errors_keep_their_kind() {
        let err: StepError = PlanError::InvalidDuration(TimecodeError::InvalidDuration(
            "-1".to_string(),
        ))
        .into();
        assert!(matches!(err, StepError::InvalidDuration(ref v) if v == "-1"));

        let err: StepError = ManifestError::Corrupt("duplicate index 1".to_string()).into();
        assert!(matches!(err, StepError::ManifestCorrupt(_)));
    }
}
