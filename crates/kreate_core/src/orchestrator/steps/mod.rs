//! The six steps of a run. See `create_standard_pipeline` for their order.

mod concat;
mod extract;
mod head_trim;
mod manifest;
mod plan;
mod probe;

pub use concat::ConcatStep;
pub use extract::ExtractStep;
pub use head_trim::HeadTrimStep;
pub use manifest::ManifestStep;
pub use plan::PlanStep;
pub use probe::ProbeStep;

use crate::logging::ToolOrigin;
use crate::media::{MediaError, ToolOutput};

use super::types::Context;

/// Log a finished tool call and keep its stderr in `origin`'s tail.
fn record_tool_output(ctx: &Context, origin: ToolOrigin, output: &ToolOutput) {
    let command = Some(output.command.as_str()).filter(|c| !c.is_empty());
    ctx.logger.tool_output(origin, command, &output.stderr_lines);
}

/// Keep a failed tool's stderr in `origin`'s tail for the failure report.
fn record_tool_failure(ctx: &Context, origin: ToolOrigin, err: &MediaError) {
    ctx.logger.tool_output(origin, None, err.stderr_lines());
    tracing::debug!("{} failed for {}: {}", ctx.media.name(), origin, err);
}
