//! kreate - cut a highlights clip out of a long video.
//!
//! Samples evenly spaced segments across the source and stitches them into
//! `<stem>-best-<timestamp>.<ext>`, after first copying the opening stretch
//! to `<stem>-first-<timestamp>.<ext>`. All media work is done by ffmpeg.
//!
//! Usage:
//!   kreate -i talk.mp4 -d 60 -p 10
//!   kreate -i talk.mp4 --dry-run

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;

use kreate_core::config::{ConfigManager, ConfigSection, Settings};
use kreate_core::logging::{self, ConsoleCallback, LogLevel};
use kreate_core::media::FfmpegTool;
use kreate_core::orchestrator::{JobOptions, JobReport, JobRunner, RunSpec};
use kreate_core::planning::{OverrunPolicy, SegmentPlan};
use kreate_core::timecode;

/// Config file used when `--config` is not given (only read if present).
const DEFAULT_CONFIG_PATH: &str = ".config/kreate.toml";

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "kreate")]
#[command(version)]
#[command(about = "Cut a highlights clip out of a long video", long_about = None)]
struct Args {
    /// Input video file path
    #[arg(short, long, default_value = "example.mp4")]
    input: PathBuf,

    /// Offset of the first segment, in seconds [default: 0]
    #[arg(short, long)]
    start: Option<String>,

    /// Total highlight length, in seconds [default: 60]
    #[arg(short, long)]
    duration: Option<String>,

    /// Length of each segment, in seconds [default: 10]
    #[arg(short, long)]
    part: Option<String>,

    /// Extract segments in parallel
    #[arg(long, visible_alias = "pp")]
    parallel: bool,

    /// Maximum concurrent extractions (0 = one per CPU)
    #[arg(long)]
    jobs: Option<usize>,

    /// What to do when a segment runs past the end of the source
    #[arg(long, value_name = "reject|clamp|drop")]
    overrun: Option<OverrunPolicy>,

    /// Config file (created with defaults if missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the given trim window and options to the config file
    #[arg(long)]
    write_config: bool,

    /// Leave the work area on disk after the run
    #[arg(long)]
    keep_work_area: bool,

    /// Probe and print the segment plan without extracting anything
    #[arg(long)]
    dry_run: bool,

    /// Print the recorded job state as JSON when done
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&args, config.settings_mut());

    let level = if args.verbose {
        LogLevel::Debug
    } else if args.quiet {
        LogLevel::Warn
    } else {
        config.settings().logging.level
    };
    let _guard = logging::init_tracing_with_file(level, &config.logs_folder());

    let spec = RunSpec::from_settings(&args.input, config.settings())
        .with_raw_window(
            args.start.as_deref(),
            args.duration.as_deref(),
            args.part.as_deref(),
        )
        .context("Invalid trim window")?;

    if args.write_config {
        save_config(&mut config, &spec, &args)?;
    }

    let settings = config.into_settings();
    let media = FfmpegTool::new()
        .with_ffmpeg(&settings.tools.ffmpeg)
        .with_ffprobe(&settings.tools.ffprobe);

    tracing::debug!("Running {} with {:?}", args.input.display(), spec);

    let options = JobOptions {
        dry_run: args.dry_run,
        console: console_callback(args.quiet),
        ..JobOptions::default()
    };
    let report = JobRunner::new(settings, Arc::new(media))
        .run(spec, options)
        .with_context(|| format!("Failed to process {}", args.input.display()))?;

    if args.json {
        println!("{}", report.state.to_json_pretty()?);
    } else if args.dry_run {
        if let Some(ref plan) = report.state.plan {
            print!("{}", render_plan(plan)?);
        }
    } else {
        print_summary(&report);
    }

    Ok(())
}

/// Load the config file: `--config` is created if missing, the default path
/// is only read if it exists.
fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    let mut manager = ConfigManager::new(path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH)));

    match path {
        Some(p) => manager
            .load_or_create()
            .with_context(|| format!("Cannot load config {}", p.display()))?,
        None if manager.path().exists() => manager
            .load()
            .with_context(|| format!("Cannot load config {}", DEFAULT_CONFIG_PATH))?,
        None => {}
    }

    Ok(manager)
}

/// Flags that map straight onto settings.
fn apply_overrides(args: &Args, settings: &mut Settings) {
    if args.parallel {
        settings.run.parallel = true;
    }
    if let Some(jobs) = args.jobs {
        settings.run.max_jobs = jobs;
    }
    if args.keep_work_area {
        settings.run.keep_work_area = true;
    }
    if let Some(policy) = args.overrun {
        settings.planner.overrun_policy = policy;
    }
    if args.verbose {
        settings.logging.level = LogLevel::Debug;
        settings.logging.compact = false;
    } else if args.quiet {
        settings.logging.level = LogLevel::Warn;
    }
}

fn save_config(config: &mut ConfigManager, spec: &RunSpec, args: &Args) -> Result<()> {
    let trim = &mut config.settings_mut().trim;
    trim.start = spec.window.start;
    trim.duration = spec.window.duration;
    trim.part_duration = spec.part_duration;

    let mut sections = vec![ConfigSection::Trim];
    if args.overrun.is_some() {
        sections.push(ConfigSection::Planner);
    }
    if args.parallel || args.jobs.is_some() || args.keep_work_area {
        sections.push(ConfigSection::Run);
    }

    for section in sections {
        config
            .update_section(section)
            .with_context(|| {
                format!(
                    "Cannot write [{}] to {}",
                    section.table_name(),
                    config.path().display()
                )
            })?;
    }
    tracing::info!("Saved config to {}", config.path().display());
    Ok(())
}

fn console_callback(quiet: bool) -> Option<ConsoleCallback> {
    if quiet {
        return None;
    }
    Some(Box::new(|line: &str| println!("{}", line)))
}

/// One line per segment: index, start and length as passed to ffmpeg.
fn render_plan(plan: &SegmentPlan) -> Result<String> {
    let mut out = format!(
        "{} segment(s), gap {}s, stride {}s, source {}s\n",
        plan.len(),
        plan.gap,
        plan.stride(),
        plan.source_duration
    );
    for segment in plan {
        out.push_str(&format!(
            "{:>4}  {:>12}  {:>10}\n",
            segment.index,
            timecode::format_seconds(segment.start)?,
            timecode::format_seconds(segment.duration)?
        ));
    }
    Ok(out)
}

fn print_summary(report: &JobReport) {
    if let Some(path) = report.state.head_output() {
        println!("First: {}", path.display());
    }
    if let Some(path) = report.state.best_output() {
        println!("Best:  {}", path.display());
    }
    if let Some(ref path) = report.kept_work_area {
        println!("Work area kept at {}", path.display());
    }
    if let Some(ref path) = report.log_path {
        println!("Log:   {}", path.display());
    }
}
