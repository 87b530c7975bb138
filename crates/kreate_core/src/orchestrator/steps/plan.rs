//! Lays the sampled segments out across the source.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};
use crate::planning::plan_segments;
use crate::timecode;

#[derive(Debug, Default)]
pub struct PlanStep;

impl PlanStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for PlanStep {
    fn name(&self) -> &'static str {
        "Plan"
    }

    fn summary(&self) -> &'static str {
        "evenly spaced segments"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.source_duration() {
            Some(_) => Ok(()),
            None => Err(StepError::invalid_input("source duration unknown")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let source_duration = state
            .source_duration()
            .ok_or_else(|| StepError::invalid_input("source duration unknown"))?;
        let plan = plan_segments(
            &ctx.spec.window,
            ctx.spec.part_duration,
            source_duration,
            ctx.spec.overrun_policy,
        )?;

        ctx.logger.note(&format!(
            "{} x {}s, every {}s ({}s gap, {} overruns)",
            plan.len(),
            plan.part_duration,
            plan.stride(),
            plan.gap,
            ctx.spec.overrun_policy
        ));
        let dropped = plan.requested_parts.saturating_sub(plan.len());
        if dropped > 0 {
            ctx.logger.warn(&format!(
                "{} of {} segment(s) ran past the source and were dropped",
                dropped, plan.requested_parts
            ));
        }
        for segment in &plan {
            ctx.logger.detail(&format!(
                "{:>4}  {}  +{}",
                segment.index,
                timecode::format_seconds(segment.start)?,
                timecode::format_seconds(segment.duration)?
            ));
        }

        state.plan = Some(plan);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.plan.as_ref() {
            None => Err(StepError::invalid_output("plan not recorded")),
            Some(plan) if plan.is_empty() => {
                Err(StepError::InvalidPlan("no segment fits the source".to_string()))
            }
            Some(_) => Ok(()),
        }
    }
}
