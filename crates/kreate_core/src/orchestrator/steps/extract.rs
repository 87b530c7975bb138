//! One stream-copy trim per planned segment.
//!
//! Segment `i` lands in the work area as `<i>.<source ext>`. Segments are
//! cut one at a time unless the run asks for parallel extraction, in which
//! case they run on a rayon pool of at most `max_jobs` threads. Either way
//! the step fails on the first segment that fails, naming it, and returns
//! only after every started extraction has returned.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::logging::{percent_of, ToolOrigin};
use crate::media::TrimRequest;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, ExtractOutput, JobState};
use crate::planning::SegmentSpec;
use crate::timecode;

use super::{record_tool_failure, record_tool_output};

#[derive(Debug, Default)]
pub struct ExtractStep;

/// Shared by every extraction of one step run.
struct Batch<'a> {
    ctx: &'a Context,
    extension: Option<&'a str>,
    total: usize,
    finished: AtomicUsize,
}

impl Batch<'_> {
    fn cut(&self, segment: &SegmentSpec) -> StepResult<(usize, PathBuf)> {
        let ctx = self.ctx;
        let origin = ToolOrigin::Segment(segment.index);
        let output_path = ctx.work_area.segment_path(segment.index, self.extension);

        let request = TrimRequest::new(
            ctx.source(),
            timecode::format_seconds(segment.start)?,
            timecode::format_seconds(segment.duration)?,
            &output_path,
        );
        match ctx.media.trim(&request) {
            Ok(output) => record_tool_output(ctx, origin, &output),
            Err(source) => {
                record_tool_failure(ctx, origin, &source);
                return Err(StepError::extraction_failed(segment.index, source));
            }
        }

        let done = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.logger.segment_done(segment.index, done, self.total);
        ctx.report_progress(
            "Extract",
            percent_of(done, self.total),
            &format!("segment {} of {}", done, self.total),
        );
        Ok((segment.index, output_path))
    }
}

impl ExtractStep {
    pub fn new() -> Self {
        Self
    }

    fn run_in_order(batch: &Batch<'_>, segments: &[SegmentSpec]) -> StepResult<BTreeMap<usize, PathBuf>> {
        segments.iter().map(|segment| batch.cut(segment)).collect()
    }

    fn run_on_pool(batch: &Batch<'_>, segments: &[SegmentSpec]) -> StepResult<BTreeMap<usize, PathBuf>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(batch.ctx.spec.max_jobs)
            .thread_name(|i| format!("kreate-extract-{}", i))
            .build()?;
        batch.ctx.logger.note(&format!(
            "extracting on {} thread(s)",
            pool.current_num_threads()
        ));

        // collect() joins every task it spawned before returning
        pool.install(|| segments.par_iter().map(|segment| batch.cut(segment)).collect())
    }
}

impl PipelineStep for ExtractStep {
    fn name(&self) -> &'static str {
        "Extract"
    }

    fn summary(&self) -> &'static str {
        "one file per segment in the work area"
    }

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.plan.is_none() {
            return Err(StepError::invalid_input("no segment plan"));
        }
        if !ctx.work_area.path().is_dir() {
            return Err(StepError::invalid_input(format!(
                "work area {} is gone",
                ctx.work_area.path().display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let plan = state
            .plan
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("no segment plan"))?;

        let extension = ctx.spec.extension();
        let batch = Batch {
            ctx,
            extension: extension.as_deref(),
            total: plan.len(),
            finished: AtomicUsize::new(0),
        };
        let parallel = ctx.spec.parallel && plan.len() > 1;

        let segments = if parallel {
            Self::run_on_pool(&batch, plan.segments())?
        } else {
            Self::run_in_order(&batch, plan.segments())?
        };

        state.extract = Some(ExtractOutput { segments, parallel });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let (Some(plan), Some(extract)) = (state.plan.as_ref(), state.extract.as_ref()) else {
            return Err(StepError::invalid_output("extraction not recorded"));
        };

        let produced: Vec<usize> = extract.segments.keys().copied().collect();
        if produced != plan.indices() {
            return Err(StepError::invalid_output(format!(
                "planned segments {:?} but produced {:?}",
                plan.indices(),
                produced
            )));
        }
        if let Some((index, path)) = extract.segments.iter().find(|(_, path)| !path.is_file()) {
            return Err(StepError::invalid_output(format!(
                "segment {} left no file at {}",
                index,
                path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{context_for, FakeMedia};
    use crate::orchestrator::types::ProbeOutput;
    use crate::planning::plan_segments;

    fn planned(ctx: &Context, source_duration: f64) -> JobState {
        let mut state = JobState::new("job");
        state.probe = Some(ProbeOutput {
            duration_seconds: source_duration,
        });
        state.plan = Some(
            plan_segments(
                &ctx.spec.window,
                ctx.spec.part_duration,
                source_duration,
                ctx.spec.overrun_policy,
            )
            .unwrap(),
        );
        state
    }

    #[test]
    fn extracts_one_file_per_segment() {
        let media = FakeMedia::new(2018.368);
        let (ctx, _dir) = context_for(media.clone(), |_| {});
        let mut state = planned(&ctx, 2018.368);

        let step = ExtractStep::new();
        step.validate_input(&ctx, &state).unwrap();
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        let extract = state.extract.as_ref().unwrap();
        assert_eq!(extract.segments.len(), 6);
        assert_eq!(
            extract.segments[&2],
            ctx.work_area.segment_path(2, Some("mp4"))
        );

        let starts: Vec<String> = media.trims().into_iter().map(|t| t.start).collect();
        assert_eq!(starts[0], "0.000");
        assert_eq!(starts[1], "5:46.000");
    }

    #[test]
    fn failure_names_segment() {
        let media = FakeMedia::new(2018.368).failing_on_output("/4.mp4");
        let (ctx, _dir) = context_for(media, |_| {});
        let mut state = planned(&ctx, 2018.368);

        let err = ExtractStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::ExtractionFailed { index: 4, .. }));
        assert_eq!(err.origin(), ToolOrigin::Segment(4));
        assert!(state.extract.is_none());
    }

    #[test]
    fn parallel_extraction_matches_plan() {
        let media = FakeMedia::new(2018.368);
        let (ctx, _dir) = context_for(media.clone(), |spec| {
            spec.parallel = true;
            spec.max_jobs = 3;
        });
        let mut state = planned(&ctx, 2018.368);

        let step = ExtractStep::new();
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        let extract = state.extract.as_ref().unwrap();
        assert!(extract.parallel);
        assert_eq!(extract.segments.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(media.trims().len(), 6);
    }

    #[test]
    fn parallel_failure_names_segment() {
        let media = FakeMedia::new(2018.368).failing_on_output("/5.mp4");
        let (ctx, _dir) = context_for(media, |spec| spec.parallel = true);
        let mut state = planned(&ctx, 2018.368);

        let err = ExtractStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::ExtractionFailed { index: 5, .. }));
    }

    #[test]
    fn missing_plan_is_invalid_input() {
        let (ctx, _dir) = context_for(FakeMedia::new(300.0), |_| {});
        let err = ExtractStep::new()
            .validate_input(&ctx, &JobState::new("job"))
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidInput(_)));
    }
}
