//! Ordered list of steps run against one context.

use std::time::Instant;

use super::errors::{PipelineError, PipelineResult, StepResult};
use super::step::PipelineStep;
use super::types::{Context, JobState};

/// Steps in run order. The first error ends the run; nothing is retried.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step against `state`, returning the names of those that
    /// finished.
    ///
    /// When a step fails, its error is logged together with the stderr
    /// tail of the tool call it blames (the failing segment, or the
    /// whole-run tools), and returned with the job and step names.
    pub fn run(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<Vec<String>> {
        let total = self.steps.len();
        let mut completed = Vec::with_capacity(total);

        for (position, step) in self.steps.iter().enumerate() {
            let name = step.name();
            ctx.logger.step_started(name, position + 1, total);
            ctx.report_progress(name, (position * 100 / total) as u32, step.summary());

            let started = Instant::now();
            if let Err(err) = run_step(step.as_ref(), ctx, state) {
                ctx.logger.fail(&format!("{}: {}", name, err));
                ctx.logger.dump_tail(err.origin());
                return Err(PipelineError::step_failed(&ctx.job_name, name, err));
            }
            ctx.logger.step_finished(name, started.elapsed());
            completed.push(name.to_string());
        }

        ctx.report_progress("Done", 100, "All steps finished");
        Ok(completed)
    }
}

fn run_step(step: &dyn PipelineStep, ctx: &Context, state: &mut JobState) -> StepResult<()> {
    step.validate_input(ctx, state)?;
    step.execute(ctx, state)?;
    step.validate_output(ctx, state)
}
