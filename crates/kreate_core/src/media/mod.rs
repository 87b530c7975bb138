//! External media tool boundary.
//!
//! All decoding, seeking and muxing is delegated to a subprocess:
//!
//! - **Probe**: total source duration (`ffprobe`)
//! - **Trim**: stream-copy one `[start, start+duration)` window (`ffmpeg`)
//! - **Concat**: stream-copy the files of a manifest, in order (`ffmpeg`)
//!
//! The [`MediaTool`] trait is the seam; [`FfmpegTool`] is the real backend.

mod ffmpeg;
mod probe;
mod types;

pub use ffmpeg::{describe_command, FfmpegTool};
pub use probe::{parse_duration_output, duration_command, probe_duration};
pub use types::{MediaError, MediaResult, MediaTool, ToolOutput, TrimRequest};
