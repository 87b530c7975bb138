//! Types for segment planning.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timecode::TimecodeError;

/// Errors from building a segment plan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// An input was not a finite, non-negative number.
    #[error(transparent)]
    InvalidDuration(#[from] TimecodeError),

    /// The inputs cannot produce a plan that fits the source.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}

impl PlanError {
    pub(crate) fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan(message.into())
    }
}

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// The part of the source the operator wants sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    /// Offset of the first segment, in seconds.
    pub start: f64,
    /// Total highlight length, in seconds.
    pub duration: f64,
}

impl TrimWindow {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }
}

/// What to do with segments whose window runs past the end of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrunPolicy {
    /// Fail the plan with `InvalidPlan`.
    #[default]
    Reject,
    /// Shorten the overrunning segment to end at the source's end.
    /// Segments that would start at or after the end are dropped.
    Clamp,
    /// Drop every segment that overruns.
    Drop,
}

impl std::fmt::Display for OverrunPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrunPolicy::Reject => write!(f, "reject"),
            OverrunPolicy::Clamp => write!(f, "clamp"),
            OverrunPolicy::Drop => write!(f, "drop"),
        }
    }
}

impl FromStr for OverrunPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(OverrunPolicy::Reject),
            "clamp" => Ok(OverrunPolicy::Clamp),
            "drop" => Ok(OverrunPolicy::Drop),
            other => Err(format!(
                "unknown overrun policy '{}' (expected reject, clamp or drop)",
                other
            )),
        }
    }
}

/// One planned segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    /// 1-based position in the final clip.
    pub index: usize,
    /// Offset into the source, in seconds.
    pub start: f64,
    /// Segment length, in seconds.
    pub duration: f64,
}

impl SegmentSpec {
    /// End of the segment window (exclusive).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Ordered, immutable list of segments to extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    segments: Vec<SegmentSpec>,
    /// Number of parts requested before any overrun handling.
    pub requested_parts: usize,
    /// Source skipped between consecutive segments, in seconds.
    pub gap: f64,
    /// Nominal length of each segment, in seconds.
    pub part_duration: f64,
    /// Duration of the source this plan was built against.
    pub source_duration: f64,
}

impl SegmentPlan {
    pub(crate) fn new(
        segments: Vec<SegmentSpec>,
        requested_parts: usize,
        gap: f64,
        part_duration: f64,
        source_duration: f64,
    ) -> Self {
        Self {
            segments,
            requested_parts,
            gap,
            part_duration,
            source_duration,
        }
    }

    /// Planned segments in index order.
    pub fn segments(&self) -> &[SegmentSpec] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SegmentSpec> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Distance between consecutive segment starts.
    pub fn stride(&self) -> f64 {
        self.gap + self.part_duration
    }

    /// Sum of all segment durations.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Indices in plan order.
    pub fn indices(&self) -> Vec<usize> {
        self.segments.iter().map(|s| s.index).collect()
    }
}

impl<'a> IntoIterator for &'a SegmentPlan {
    type Item = &'a SegmentSpec;
    type IntoIter = std::slice::Iter<'a, SegmentSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
