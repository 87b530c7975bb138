//! Copies the first N seconds of the source next to it.
//!
//! Needs no probe and runs first. Its output is kept even when a later step
//! fails.

use crate::logging::ToolOrigin;
use crate::media::TrimRequest;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, HeadTrimOutput, JobState};
use crate::timecode;

use super::{record_tool_failure, record_tool_output};

#[derive(Debug, Default)]
pub struct HeadTrimStep;

impl HeadTrimStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for HeadTrimStep {
    fn name(&self) -> &'static str {
        "HeadTrim"
    }

    fn summary(&self) -> &'static str {
        "first N seconds beside the source"
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if !ctx.source().is_file() {
            return Err(StepError::invalid_input(format!(
                "source {} is not a file",
                ctx.source().display()
            )));
        }
        // Zero-length head trims are not worth a tool call
        if ctx.spec.window.duration <= 0.0 {
            return Err(StepError::InvalidPlan(format!(
                "trim duration must be positive, got {}",
                ctx.spec.window.duration
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let duration = timecode::format_seconds(ctx.spec.window.duration)?;
        let output_path = ctx.head_output_path();
        ctx.logger
            .note(&format!("first {} -> {}", duration, output_path.display()));

        let request = TrimRequest::new(
            ctx.source(),
            timecode::format_seconds(0.0)?,
            duration.clone(),
            &output_path,
        );
        let output = match ctx.media.trim(&request) {
            Ok(output) => output,
            Err(source) => {
                record_tool_failure(ctx, ToolOrigin::Run, &source);
                return Err(StepError::TrimHeadFailed { source });
            }
        };
        record_tool_output(ctx, ToolOrigin::Run, &output);

        state.head_trim = Some(HeadTrimOutput {
            output_path,
            duration,
            command: output.command,
        });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let path = state
            .head_output()
            .ok_or_else(|| StepError::invalid_output("head trim not recorded"))?;
        if !path.exists() {
            return Err(StepError::invalid_output(format!(
                "head trim wrote nothing at {}",
                path.display()
            )));
        }
        Ok(())
    }
}
