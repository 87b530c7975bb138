//! The contract every pipeline step follows.

use super::errors::StepResult;
use super::types::{Context, JobState};

/// One stage of a run.
///
/// [`Pipeline`](super::Pipeline) calls `validate_input`, then `execute`,
/// then `validate_output`, and stops at the first error. A step only ever
/// fills its own section of [`JobState`]; what earlier steps recorded is
/// read-only to it.
pub trait PipelineStep: Send + Sync {
    /// Short name used in logs, progress and errors (`"Extract"`).
    fn name(&self) -> &'static str;

    /// One line on what the step produces, passed to progress callbacks.
    fn summary(&self) -> &'static str;

    /// Fail early when an earlier step's record or a file this step reads
    /// is missing.
    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Do the work and record it in `state`.
    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()>;

    /// Check that what `execute` recorded is really there.
    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;
}
