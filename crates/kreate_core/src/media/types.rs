//! Types shared by the media tool backends.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from invoking the external media tools.
#[derive(Error, Debug)]
pub enum MediaError {
    /// Input file does not exist.
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The tool could not be started at all.
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran but exited unsuccessfully.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// The tool succeeded but its output made no sense.
    #[error("Unexpected {tool} output: {message}")]
    InvalidOutput { tool: String, message: String },
}

impl MediaError {
    /// Captured stderr lines, when the tool got far enough to produce any.
    pub fn stderr_lines(&self) -> Vec<&str> {
        match self {
            MediaError::CommandFailed { message, .. } => message.lines().collect(),
            _ => Vec::new(),
        }
    }
}

/// Result type for media tool operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// A stream-copy trim of one window of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimRequest {
    pub source: PathBuf,
    /// Seek position, already formatted for the tool.
    pub start: String,
    /// Window length, already formatted for the tool.
    pub duration: String,
    pub output: PathBuf,
}

impl TrimRequest {
    pub fn new(
        source: impl AsRef<Path>,
        start: impl Into<String>,
        duration: impl Into<String>,
        output: impl AsRef<Path>,
    ) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            start: start.into(),
            duration: duration.into(),
            output: output.as_ref().to_path_buf(),
        }
    }
}

/// What a successful tool invocation left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Command line that was run, for logging.
    pub command: String,
    /// Diagnostic lines the tool printed.
    pub stderr_lines: Vec<String>,
}

/// External media tool boundary.
///
/// The core never decodes media itself; it asks an implementation of this
/// trait to probe, trim and concatenate. Implementations must be callable
/// from several threads at once when segments are extracted in parallel.
pub trait MediaTool: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Total duration of `source` in seconds.
    fn probe_duration(&self, source: &Path) -> MediaResult<f64>;

    /// Copy one window of the source into a new file without re-encoding.
    fn trim(&self, request: &TrimRequest) -> MediaResult<ToolOutput>;

    /// Copy every file listed in `manifest`, in order, into `output`.
    fn concat(&self, manifest: &Path, output: &Path) -> MediaResult<ToolOutput>;
}
