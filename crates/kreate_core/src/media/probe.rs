//! Source duration probing with ffprobe.

use std::path::Path;
use std::process::{Command, Stdio};

use super::ffmpeg::describe_command;
use super::types::{MediaError, MediaResult};

/// Get the duration of a media file in seconds using ffprobe.
///
/// Output looks like `2018.368000\n`.
pub fn probe_duration(ffprobe: &str, input_path: &Path) -> MediaResult<f64> {
    if !input_path.exists() {
        return Err(MediaError::SourceNotFound(input_path.to_path_buf()));
    }

    let mut cmd = duration_command(ffprobe, input_path);
    tracing::debug!("Running ffprobe: {}", describe_command(&cmd));

    let output = cmd.stdin(Stdio::null()).output().map_err(|e| MediaError::Spawn {
        tool: ffprobe.to_string(),
        source: e,
    })?;

    if !output.status.success() {
        return Err(MediaError::CommandFailed {
            tool: ffprobe.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let duration = parse_duration_output(&String::from_utf8_lossy(&output.stdout))?;
    tracing::debug!("Duration of {}: {}s", input_path.display(), duration);
    Ok(duration)
}

/// Build the duration query.
///
/// `ffprobe -v error -show_entries format=duration -of default=noprint_wrappers=1:nokey=1 <src>`
pub fn duration_command(ffprobe: &str, input_path: &Path) -> Command {
    let mut cmd = Command::new(ffprobe);
    cmd.args(["-v", "error", "-show_entries", "format=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(input_path);
    cmd
}

/// Parse ffprobe's bare duration output.
pub fn parse_duration_output(stdout: &str) -> MediaResult<f64> {
    let trimmed = stdout.trim();
    let invalid = |message: String| MediaError::InvalidOutput {
        tool: "ffprobe".to_string(),
        message,
    };

    let duration: f64 = trimmed
        .parse()
        .map_err(|_| invalid(format!("duration '{}' is not a number", trimmed)))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(invalid(format!("duration '{}' is not positive", trimmed)));
    }

    Ok(duration)
}
