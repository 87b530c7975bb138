//! Per-run log file with an optional console echo.
//!
//! Tool stderr is kept in a short tail per [`ToolOrigin`]: one per segment
//! and one for the whole-run calls (probe, head trim, concat). When a step
//! fails only the failing origin's tail is written out, so a segment's ffmpeg
//! diagnostics stay readable even when extractions ran in parallel.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{ConsoleCallback, LogOptions, Tag};

/// Which tool invocation a stderr line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolOrigin {
    /// Probe, head trim or concat.
    Run,
    /// Extraction of one planned segment.
    Segment(usize),
}

impl fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOrigin::Run => write!(f, "run"),
            ToolOrigin::Segment(index) => write!(f, "segment {}", index),
        }
    }
}

struct Outputs {
    file: Option<BufWriter<File>>,
    console: Option<ConsoleCallback>,
}

/// Log for one run.
///
/// Extraction threads share one logger, so every method takes `&self`.
pub struct RunLogger {
    path: Option<PathBuf>,
    options: LogOptions,
    outputs: Mutex<Outputs>,
    tails: Mutex<BTreeMap<ToolOrigin, VecDeque<String>>>,
    /// Last `progress_step` bucket written by `segment_done`.
    progress_bucket: Mutex<u32>,
}

impl RunLogger {
    /// Log to `<dir>/<run_name>.log`, creating `dir` if needed.
    pub fn to_file(
        run_name: &str,
        dir: impl AsRef<Path>,
        options: LogOptions,
        console: Option<ConsoleCallback>,
    ) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", run_name));
        let file = BufWriter::new(File::create(&path)?);
        Ok(Self::build(Some(path), Some(file), options, console))
    }

    /// Log to `console` only, or nowhere at all.
    pub fn console_only(options: LogOptions, console: Option<ConsoleCallback>) -> Self {
        Self::build(None, None, options, console)
    }

    fn build(
        path: Option<PathBuf>,
        file: Option<BufWriter<File>>,
        options: LogOptions,
        console: Option<ConsoleCallback>,
    ) -> Self {
        Self {
            path,
            options,
            outputs: Mutex::new(Outputs { file, console }),
            tails: Mutex::new(BTreeMap::new()),
            progress_bucket: Mutex::new(0),
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write `message` under `tag` if the tag's level passes the filter.
    pub fn line(&self, tag: Tag, message: &str) {
        if tag.level() >= self.options.level {
            self.emit(tag, message);
        }
    }

    pub fn note(&self, message: &str) {
        self.line(Tag::Note, message);
    }

    pub fn detail(&self, message: &str) {
        self.line(Tag::Detail, message);
    }

    pub fn warn(&self, message: &str) {
        self.line(Tag::Warn, message);
    }

    pub fn fail(&self, message: &str) {
        self.line(Tag::Fail, message);
    }

    /// `step Plan [3/6]`
    pub fn step_started(&self, name: &str, position: usize, total: usize) {
        self.line(Tag::Step, &format!("{} [{}/{}]", name, position, total));
    }

    pub fn step_finished(&self, name: &str, elapsed: Duration) {
        self.line(
            Tag::Done,
            &format!("{} in {:.2}s", name, elapsed.as_secs_f64()),
        );
    }

    /// Record one tool call.
    ///
    /// The command line is logged when known. Stderr goes into `origin`'s
    /// tail, and also into the log itself outside compact mode.
    pub fn tool_output<I>(&self, origin: ToolOrigin, command: Option<&str>, stderr: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if let Some(command) = command {
            self.line(Tag::Tool, &format!("[{}] {}", origin, command));
        }

        let lines: Vec<I::Item> = stderr.into_iter().collect();
        if lines.is_empty() {
            return;
        }

        if self.options.tail_lines > 0 {
            let mut tails = self.tails.lock();
            let tail = tails.entry(origin).or_default();
            for line in &lines {
                if tail.len() == self.options.tail_lines {
                    tail.pop_front();
                }
                tail.push_back(line.as_ref().to_string());
            }
        }

        if !self.options.compact {
            for line in &lines {
                self.line(Tag::Stderr, &format!("[{}] {}", origin, line.as_ref()));
            }
        }
    }

    /// Write out the stderr tail kept for `origin`.
    ///
    /// Written regardless of the level filter. Returns the number of tail
    /// lines written.
    pub fn dump_tail(&self, origin: ToolOrigin) -> usize {
        let lines: Vec<String> = match self.tails.lock().get(&origin) {
            Some(tail) => tail.iter().cloned().collect(),
            None => return 0,
        };

        self.emit(
            Tag::Fail,
            &format!("last {} stderr line(s) from {}:", lines.len(), origin),
        );
        for line in &lines {
            self.emit(Tag::Stderr, line);
        }
        lines.len()
    }

    /// Segment `index` was extracted; `done` of `total` are finished.
    ///
    /// In compact mode a line is only written when progress enters a new
    /// `progress_step` bucket, and always for the last segment. Returns
    /// whether a line was written.
    pub fn segment_done(&self, index: usize, done: usize, total: usize) -> bool {
        let percent = percent_of(done, total);

        if self.options.compact && done < total {
            let bucket = percent / self.options.progress_step.max(1);
            let mut last = self.progress_bucket.lock();
            if bucket <= *last {
                return false;
            }
            *last = bucket;
        }

        self.line(
            Tag::Segment,
            &format!("{} extracted ({}/{}, {}%)", index, done, total, percent),
        );
        true
    }

    pub fn flush(&self) {
        if let Some(file) = self.outputs.lock().file.as_mut() {
            let _ = file.flush();
        }
    }

    fn emit(&self, tag: Tag, message: &str) {
        let rendered = if self.options.timestamps {
            format!(
                "{} {} {}",
                Local::now().format("%H:%M:%S%.3f"),
                tag.marker(),
                message
            )
        } else {
            format!("{} {}", tag.marker(), message)
        };

        // One lock for both sinks keeps file and console in the same order
        let mut outputs = self.outputs.lock();
        if let Some(file) = outputs.file.as_mut() {
            let _ = writeln!(file, "{}", rendered);
        }
        if let Some(console) = outputs.console.as_ref() {
            console(&rendered);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Whole percent of `done` out of `total`, rounded down.
pub(crate) fn percent_of(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u32
}
