//! Segment planning.
//!
//! Turns a trim window and a source duration into the list of segments that
//! make up the highlights clip:
//!
//! ```text
//! source  |====|.........|====|.........|====|.........|====|...
//!          part    gap    part    gap    part    gap    part
//!         ^start_1       ^start_2       ^start_3       ^start_4
//! ```
//!
//! `parts = floor(trim / part)`, `gap = floor(source) div parts`,
//! `start_{i+1} = start_i + gap + part`.

mod planner;
mod types;

pub use planner::{plan_segments, MAX_SEGMENTS};
pub use types::{OverrunPolicy, PlanError, PlanResult, SegmentPlan, SegmentSpec, TrimWindow};
