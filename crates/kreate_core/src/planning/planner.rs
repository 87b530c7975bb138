//! Segment position calculation.
//!
//! Pure functions, no I/O. The same inputs always yield the same plan.

use crate::timecode::TimecodeError;

use super::types::{OverrunPolicy, PlanError, PlanResult, SegmentPlan, SegmentSpec, TrimWindow};

/// Most segments a single plan may hold. Each one is a separate ffmpeg run
/// and a separate file in the work area.
pub const MAX_SEGMENTS: usize = 100_000;

/// Plan evenly spread segments across the source.
///
/// `parts = floor(window.duration / part_duration)` segments of
/// `part_duration` seconds are placed starting at `window.start`, each one
/// `gap + part_duration` after the previous, where
/// `gap = floor(source_duration) div parts`.
///
/// Segments that run past `source_duration` are handled per `policy`.
pub fn plan_segments(
    window: &TrimWindow,
    part_duration: f64,
    source_duration: f64,
    policy: OverrunPolicy,
) -> PlanResult<SegmentPlan> {
    for value in [window.start, window.duration, part_duration, source_duration] {
        if !value.is_finite() || value < 0.0 {
            return Err(TimecodeError::InvalidDuration(value.to_string()).into());
        }
    }

    if window.duration <= 0.0 {
        return Err(PlanError::invalid_plan("trim duration must be positive"));
    }
    if part_duration <= 0.0 {
        return Err(PlanError::invalid_plan("part duration must be positive"));
    }
    if source_duration <= 0.0 {
        return Err(PlanError::invalid_plan("source duration must be positive"));
    }

    let requested = (window.duration / part_duration).floor();
    if requested < 1.0 {
        return Err(PlanError::invalid_plan(format!(
            "part duration {}s is longer than trim duration {}s",
            part_duration, window.duration
        )));
    }
    if requested > MAX_SEGMENTS as f64 {
        return Err(PlanError::invalid_plan(format!(
            "{}s of {}s parts would need {} segments, at most {} are allowed",
            window.duration, part_duration, requested, MAX_SEGMENTS
        )));
    }
    let parts = requested as usize;

    let gap = ((source_duration.floor() as u64) / parts as u64) as f64;
    let stride = gap + part_duration;

    let capacity = parts.min(fitting_starts(window.start, stride, source_duration));
    let mut segments = Vec::with_capacity(capacity);
    for i in 0..parts {
        let spec = SegmentSpec {
            index: i + 1,
            start: window.start + i as f64 * stride,
            duration: part_duration,
        };

        if spec.end() <= source_duration {
            segments.push(spec);
            continue;
        }

        match policy {
            OverrunPolicy::Reject => {
                return Err(PlanError::invalid_plan(format!(
                    "segment {} window [{}, {}) runs past the source end at {}s",
                    spec.index,
                    spec.start,
                    spec.end(),
                    source_duration
                )));
            }
            OverrunPolicy::Clamp => {
                if spec.start < source_duration {
                    segments.push(SegmentSpec {
                        duration: source_duration - spec.start,
                        ..spec
                    });
                }
                // Starts only grow from here, nothing later can fit.
                break;
            }
            OverrunPolicy::Drop => break,
        }
    }

    if segments.is_empty() {
        return Err(PlanError::invalid_plan(format!(
            "no segment fits inside the {}s source when starting at {}s",
            source_duration, window.start
        )));
    }

    tracing::debug!(
        "Planned {}/{} segments: gap={}s stride={}s",
        segments.len(),
        parts,
        gap,
        stride
    );

    Ok(SegmentPlan::new(
        segments,
        parts,
        gap,
        part_duration,
        source_duration,
    ))
}

/// Upper bound on how many segment starts land inside the source.
fn fitting_starts(start: f64, stride: f64, source_duration: f64) -> usize {
    if start >= source_duration {
        return 0;
    }
    // Saturating cast, min() against `parts` bounds it anyway
    ((source_duration - start) / stride).ceil() as usize
}
