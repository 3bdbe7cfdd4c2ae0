// powertrim-cli/src/commands/export.rs
//
// The `export` command: builds a job from the arguments, runs it on a worker
// thread and renders its progress until it ends.

use crate::cli::ExportArgs;
use crate::commands::check_tools;
use crate::logging;
use crate::segments::{self, Project};
use crate::terminal::{self, JobProgressBar};
use crate::CliResult;

use anyhow::{Context, bail};
use log::{debug, info, warn};
use powertrim_core::{
    CancellationToken, CoreError, ErrorPolicy, ExportMode, ExportSettings, JobOrchestrator,
    JobOutcome, JobReport, JobSpec, Segment, TrackSelection, format_duration, spawn_job_with_token,
};
use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::thread;

/// Builds the job described by `args`.
pub fn build_job(args: &ExportArgs) -> CliResult<(ExportSettings, Vec<Segment>)> {
    if let Some(job_file) = &args.job_file {
        let JobSpec {
            mut settings,
            mut segments,
        } = JobSpec::from_json_file(job_file)?;
        args.tools.apply(&mut settings.tools);
        for range in &args.segments {
            segments.push(segments::parse_range(range)?);
        }
        return Ok((settings, segments));
    }

    let mut segments = Vec::new();
    let project_source = match &args.project {
        Some(path) => {
            let project = Project::load(path)?;
            segments.extend(project.segments);
            Some(project.video_path)
        }
        None => None,
    };
    if let Some(csv) = &args.csv {
        segments.extend(segments::load_csv(csv)?);
    }
    for range in &args.segments {
        segments.push(segments::parse_range(range)?);
    }

    // An explicit --input wins over the project's video path
    let Some(source) = args.input.clone().or(project_source) else {
        bail!("No source video given; use --input, --project or --job");
    };
    if segments.is_empty() {
        bail!("No segments given; use --segment, --csv, --project or --job");
    }

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => default_output_dir(&source),
    };

    let mut settings = ExportSettings::new(source, output_dir);
    settings.mode = ExportMode::from(args.mode);
    settings.merge = args.merge;
    settings.output_template = args.template.clone();
    settings.crop = args.crop;
    settings.tracks = TrackSelection::with_streams(args.tracks.iter().copied());
    if !args.languages.is_empty() {
        settings.tracks.language_priority = args.languages.clone();
    }
    if args.stop_on_error {
        settings.error_policy = ErrorPolicy::StopOnFirstError;
    }
    args.tools.apply(&mut settings.tools);

    Ok((settings, segments))
}

fn default_output_dir(source: &Path) -> PathBuf {
    match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Cancels the job when the user enters `q`.
///
/// Reads whole lines so the terminal stays in its normal mode.
fn spawn_quit_listener(cancel: CancellationToken) {
    let spawned = thread::Builder::new()
        .name("powertrim-keys".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    info!("Cancellation requested");
                    cancel.cancel();
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Could not listen for the quit key: {e}");
    }
}

fn print_settings(settings: &ExportSettings, segments: &[Segment], log_path: &Path) {
    terminal::print_section("Export");
    terminal::print_status("Source", &settings.source.display().to_string(), true);
    terminal::print_status("Output folder", &settings.output_dir.display().to_string(), false);
    terminal::print_status("Mode", settings.mode.as_str(), false);
    terminal::print_status("Segments", &segments.len().to_string(), false);
    terminal::print_status("Merge", if settings.merge { "yes" } else { "no" }, false);
    if settings.crop {
        let crop = if settings.wants_crop() {
            "auto"
        } else {
            "ignored (re-encode only)"
        };
        terminal::print_status("Crop", crop, false);
    }
    terminal::print_status("Log file", &log_path.display().to_string(), false);
}

fn print_outputs(outputs: &[PathBuf]) {
    for output in outputs {
        terminal::print_sub_item(&output.display().to_string());
    }
}

fn print_report(report: &JobReport) {
    terminal::print_section("Summary");
    let what = if report.merged {
        format!("Merged {} segment(s) into one file", report.segments)
    } else {
        format!("Exported {} clip(s)", report.outputs.len())
    };
    terminal::print_success(&what);
    print_outputs(&report.outputs);
    if let Some(crop) = &report.crop {
        terminal::print_status("Crop", &crop.to_string(), false);
    }
    terminal::print_status(
        "Elapsed",
        &format_duration(report.elapsed.as_secs_f64()),
        false,
    );
}

fn failure_suggestion(error: &CoreError) -> Option<&'static str> {
    match error {
        CoreError::Config(message) if message.contains("smart-cut") => {
            Some("Export this source with --mode re-encode instead.")
        }
        CoreError::Probe(_) => Some("Check that the source exists and is a readable video file."),
        CoreError::SegmentsFailed { .. } | CoreError::Extract(_) => {
            Some("Run with --verbose or see the log file for the full ffmpeg output.")
        }
        _ => None,
    }
}

/// Prints the outcome and returns the process exit code.
pub fn report_outcome(outcome: &JobOutcome) -> i32 {
    match outcome {
        JobOutcome::Done(report) => print_report(report),
        JobOutcome::Failed { error, produced } => {
            terminal::print_error("Export failed", &error.to_string(), failure_suggestion(error));
            if !produced.is_empty() {
                terminal::print_processing("Clips kept:");
                print_outputs(produced);
            }
        }
        JobOutcome::Cancelled { produced } => {
            terminal::print_cancelled("Export cancelled");
            if !produced.is_empty() {
                terminal::print_processing("Clips kept:");
                print_outputs(produced);
            }
        }
    }
    outcome.exit_code()
}

/// Runs the `export` command and returns the process exit code.
pub fn run_export(args: ExportArgs, verbose: bool) -> CliResult<i32> {
    let (settings, segments) = build_job(&args)?;

    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| settings.output_dir.join("logs"));
    let log_path = logging::init(verbose, &log_dir)?;
    debug!("Export settings: {settings:?}");

    check_tools(&settings.tools, settings.mode == ExportMode::SmartCut)?;
    print_settings(&settings, &segments, &log_path);

    let cancel = CancellationToken::new();
    let interactive = io::stdin().is_terminal();
    if interactive {
        spawn_quit_listener(cancel.clone());
    }

    let orchestrator = JobOrchestrator::for_tools(&settings.tools);
    let handle = spawn_job_with_token(orchestrator, settings, segments, cancel)
        .context("Failed to start the export worker")?;

    terminal::print_section("Progress");
    if interactive {
        terminal::print_processing("Enter q to cancel");
    }
    let bar = JobProgressBar::new();
    // The channel disconnects when the worker drops its reporter
    for update in handle.progress().iter() {
        bar.update(&update);
    }
    bar.finish();

    let outcome = handle.wait();
    info!("Job finished: {}", outcome.state());
    Ok(report_outcome(&outcome))
}
