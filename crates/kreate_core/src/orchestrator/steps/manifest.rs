//! Writes the concat list for the extracted segments.
//!
//! The list is built from a scan of the work area, ordered by the index in
//! each file name. The scanned set has to match the plan and the extraction
//! record.

use crate::manifest::Manifest;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, ManifestOutput};

#[derive(Debug, Default)]
pub struct ManifestStep;

impl ManifestStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for ManifestStep {
    fn name(&self) -> &'static str {
        "Manifest"
    }

    fn summary(&self) -> &'static str {
        "ordered concat list"
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
        let scanned = Manifest::scan(&ctx.work_area, extension.as_deref())?;
        scanned.verify_indices(&plan.indices())?;

        // What Extract reported must be exactly what is on disk
        if let Some(extract) = state.extract.as_ref() {
            let reported = Manifest::from_entries(
                extract.segments.iter().map(|(i, path)| (*i, path.clone())),
            )?;
            if reported.entries() != scanned.entries() {
                return Err(StepError::manifest_corrupt(format!(
                    "work area holds segments {:?}, extraction reported {:?}",
                    scanned.indices(),
                    reported.indices()
                )));
            }
        }

        let manifest_path = ctx.work_area.manifest_path();
        scanned.write_to(&manifest_path)?;
        ctx.logger.note(&format!(
            "{} segment(s) listed in {}",
            scanned.len(),
            manifest_path.display()
        ));

        state.manifest = Some(ManifestOutput {
            manifest_path,
            entries: scanned.entries().iter().map(|e| e.path.clone()).collect(),
        });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let manifest = state
            .manifest
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("manifest not recorded"))?;
        if manifest.entries.is_empty() || !manifest.manifest_path.is_file() {
            return Err(StepError::invalid_output(format!(
                "no usable manifest at {}",
                manifest.manifest_path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{context_for, FakeMedia};
    use crate::orchestrator::types::{ExtractOutput, ProbeOutput};
    use crate::planning::plan_segments;
    use std::collections::BTreeMap;
    use std::fs;

    fn with_segments(ctx: &Context, indices: &[usize]) -> JobState {
        let mut state = JobState::new("job");
        state.probe = Some(ProbeOutput {
            duration_seconds: 2018.368,
        });
        state.plan = Some(
            plan_segments(&ctx.spec.window, ctx.spec.part_duration, 2018.368, ctx.spec.overrun_policy)
                .unwrap(),
        );

        let mut segments = BTreeMap::new();
        // Written out of order on purpose
        for index in indices.iter().rev() {
            let path = ctx.work_area.segment_path(*index, Some("mp4"));
            fs::write(&path, b"segment").unwrap();
            segments.insert(*index, path);
        }
        state.extract = Some(ExtractOutput {
            segments,
            parallel: false,
        });
        state
    }

    #[test]
    fn writes_ordered_manifest() {
        let (ctx, _dir) = context_for(FakeMedia::new(2018.368), |_| {});
        let mut state = with_segments(&ctx, &[1, 2, 3, 4, 5, 6]);
        // Stray file with another extension is ignored
        fs::write(ctx.work_area.path().join("notes.txt"), b"x").unwrap();

        let step = ManifestStep::new();
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        let content = fs::read_to_string(ctx.work_area.manifest_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].ends_with("/1.mp4'"));
        assert!(lines[5].ends_with("/6.mp4'"));
    }

    #[test]
    fn missing_segment_is_corrupt() {
        let (ctx, _dir) = context_for(FakeMedia::new(2018.368), |_| {});
        let mut state = with_segments(&ctx, &[1, 2, 3, 5, 6]);

        let err = ManifestStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::ManifestCorrupt(_)));
    }

    #[test]
    fn stray_numeric_file_is_corrupt() {
        let (ctx, _dir) = context_for(FakeMedia::new(2018.368), |_| {});
        let mut state = with_segments(&ctx, &[1, 2, 3, 4, 5, 6]);
        fs::write(ctx.work_area.path().join("01.mp4"), b"dup").unwrap();

        let err = ManifestStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::ManifestCorrupt(_)));
    }
}
