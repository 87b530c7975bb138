//! Measures the source's total duration.

use crate::logging::ToolOrigin;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, ProbeOutput};
use crate::timecode;

use super::record_tool_failure;

#[derive(Debug, Default)]
pub struct ProbeStep;

impl ProbeStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for ProbeStep {
    fn name(&self) -> &'static str {
        "Probe"
    }

    fn summary(&self) -> &'static str {
        "source duration"
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if ctx.source().is_file() {
            Ok(())
        } else {
            Err(StepError::invalid_input(format!(
                "source {} is not a file",
                ctx.source().display()
            )))
        }
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let duration_seconds = ctx.media.probe_duration(ctx.source()).map_err(|source| {
            record_tool_failure(ctx, ToolOrigin::Run, &source);
            StepError::ProbeFailed { source }
        })?;

        match timecode::format_seconds(duration_seconds) {
            Ok(shown) => ctx.logger.note(&format!("source runs {}", shown)),
            Err(_) => ctx
                .logger
                .warn(&format!("source reports {} seconds", duration_seconds)),
        }

        state.probe = Some(ProbeOutput { duration_seconds });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.source_duration() {
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => Ok(()),
            Some(seconds) => Err(StepError::invalid_output(format!(
                "source duration {} is not positive",
                seconds
            ))),
            None => Err(StepError::invalid_output("source duration not recorded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{context_for, FakeMedia};

    #[test]
    fn records_duration() {
        let (ctx, _dir) = context_for(FakeMedia::new(2018.368), |_| {});
        let mut state = JobState::new("job");

        let step = ProbeStep::new();
        step.validate_input(&ctx, &state).unwrap();
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();
        assert_eq!(state.source_duration(), Some(2018.368));
    }

    #[test]
    fn zero_length_source_fails_output_check() {
        let (ctx, _dir) = context_for(FakeMedia::new(0.0), |_| {});
        let mut state = JobState::new("job");

        ProbeStep::new().execute(&ctx, &mut state).unwrap();
        let err = ProbeStep::new().validate_output(&ctx, &state).unwrap_err();
        assert!(matches!(err, StepError::InvalidOutput(_)));
    }

    #[test]
    fn tool_failure_is_reported() {
        let (ctx, _dir) = context_for(FakeMedia::new(300.0).failing_probe(), |_| {});
        let mut state = JobState::new("job");

        let err = ProbeStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::ProbeFailed { .. }));
    }
}
