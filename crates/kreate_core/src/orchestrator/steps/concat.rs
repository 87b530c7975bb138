//! Reassembles the listed segments into `<stem>-best-<timestamp>.<ext>`.

use crate::logging::ToolOrigin;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{ConcatOutput, Context, JobState};

use super::{record_tool_failure, record_tool_output};

#[derive(Debug, Default)]
pub struct ConcatStep;

impl ConcatStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for ConcatStep {
    fn name(&self) -> &'static str {
        "Concat"
    }

    fn summary(&self) -> &'static str {
        "highlights clip beside the source"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.manifest.as_ref() {
            Some(m) if m.manifest_path.is_file() => Ok(()),
            Some(m) => Err(StepError::invalid_input(format!(
                "manifest {} is gone",
                m.manifest_path.display()
            ))),
            None => Err(StepError::invalid_input("no manifest written")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let manifest_path = state
            .manifest
            .as_ref()
            .map(|m| m.manifest_path.clone())
            .ok_or_else(|| StepError::invalid_input("no manifest written"))?;
        let output_path = ctx.best_output_path();
        ctx.logger.note(&format!("writing {}", output_path.display()));

        let output = match ctx.media.concat(&manifest_path, &output_path) {
            Ok(output) => output,
            Err(source) => {
                record_tool_failure(ctx, ToolOrigin::Run, &source);
                return Err(StepError::ReassemblyFailed { source });
            }
        };
        record_tool_output(ctx, ToolOrigin::Run, &output);

        state.concat = Some(ConcatOutput {
            output_path,
            command: output.command,
        });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.best_output() {
            Some(path) if path.exists() => Ok(()),
            Some(path) => Err(StepError::invalid_output(format!(
                "concat wrote nothing at {}",
                path.display()
            ))),
            None => Err(StepError::invalid_output("concat not recorded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{context_for, FakeMedia};
    use crate::orchestrator::types::ManifestOutput;
    use std::fs;

    fn with_manifest(ctx: &Context) -> JobState {
        let manifest_path = ctx.work_area.manifest_path();
        let segment = ctx.work_area.segment_path(1, Some("mp4"));
        fs::write(&segment, b"segment").unwrap();
        fs::write(&manifest_path, format!("file '{}'\n", segment.display())).unwrap();

        let mut state = JobState::new("job");
        state.manifest = Some(ManifestOutput {
            manifest_path,
            entries: vec![segment],
        });
        state
    }

    #[test]
    fn concatenates_to_best_output() {
        let media = FakeMedia::new(300.0);
        let (ctx, _dir) = context_for(media.clone(), |_| {});
        let mut state = with_manifest(&ctx);

        let step = ConcatStep::new();
        step.validate_input(&ctx, &state).unwrap();
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        assert_eq!(state.best_output(), Some(ctx.best_output_path().as_path()));
        assert_eq!(media.concats().len(), 1);
    }

    #[test]
    fn tool_failure_is_reassembly_failed() {
        let media = FakeMedia::new(300.0).failing_on_output("-best-");
        let (ctx, _dir) = context_for(media, |_| {});
        let mut state = with_manifest(&ctx);

        let err = ConcatStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::ReassemblyFailed { .. }));
    }

    #[test]
    fn missing_manifest_is_invalid_input() {
        let (ctx, _dir) = context_for(FakeMedia::new(300.0), |_| {});
        let err = ConcatStep::new()
            .validate_input(&ctx, &JobState::new("job"))
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidInput(_)));
    }
}
