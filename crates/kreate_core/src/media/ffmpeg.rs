//! FFmpeg-backed media tool.
//!
//! Every operation is a blocking subprocess call with stdin closed. Trim and
//! concat use `-c copy`, so nothing is re-encoded, and `-n` so an existing
//! output file fails the call instead of prompting.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use super::probe;
use super::types::{MediaError, MediaResult, MediaTool, ToolOutput, TrimRequest};

/// Media tool that shells out to `ffmpeg` and `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegTool {
    /// Use `ffmpeg` and `ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }

    /// Set a custom ffmpeg executable.
    pub fn with_ffmpeg(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg = path.into();
        self
    }

    /// Set a custom ffprobe executable.
    pub fn with_ffprobe(mut self, path: impl Into<String>) -> Self {
        self.ffprobe = path.into();
        self
    }

    /// Build the trim command.
    ///
    /// `ffmpeg -n -v error -i <src> -ss <start> -t <dur> -c copy <out>`
    pub fn trim_command(&self, request: &TrimRequest) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-n")
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(&request.source)
            .arg("-ss")
            .arg(&request.start)
            .arg("-t")
            .arg(&request.duration)
            .arg("-c")
            .arg("copy")
            .arg(&request.output);
        cmd
    }

    /// Build the concat command.
    ///
    /// `ffmpeg -n -v error -f concat -safe 0 -i <manifest> -c copy <out>`
    pub fn concat_command(&self, manifest: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-n")
            .arg("-v")
            .arg("error")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(manifest)
            .arg("-c")
            .arg("copy")
            .arg(output);
        cmd
    }

    fn run(&self, mut cmd: Command) -> MediaResult<ToolOutput> {
        let command = describe_command(&cmd);
        tracing::debug!("Running ffmpeg: {}", command);

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| MediaError::Spawn {
                tool: self.ffmpeg.clone(),
                source: e,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(MediaError::CommandFailed {
                tool: self.ffmpeg.clone(),
                exit_code: output.status.code().unwrap_or(-1),
                message: stderr.trim().to_string(),
            });
        }

        Ok(ToolOutput {
            command,
            stderr_lines: stderr.lines().map(str::to_string).collect(),
        })
    }
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaTool for FfmpegTool {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn probe_duration(&self, source: &Path) -> MediaResult<f64> {
        probe::probe_duration(&self.ffprobe, source)
    }

    fn trim(&self, request: &TrimRequest) -> MediaResult<ToolOutput> {
        if !request.source.exists() {
            return Err(MediaError::SourceNotFound(request.source.clone()));
        }
        self.run(self.trim_command(request))
    }

    fn concat(&self, manifest: &Path, output: &Path) -> MediaResult<ToolOutput> {
        if !manifest.exists() {
            return Err(MediaError::SourceNotFound(manifest.to_path_buf()));
        }
        self.run(self.concat_command(manifest, output))
    }
}

/// Render a command line for logs.
pub fn describe_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(quote_arg)
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &OsStr) -> String {
    let arg = arg.to_string_lossy();
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.into_owned()
    }
}
