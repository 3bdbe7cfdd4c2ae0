// ============================================================================
// powertrim-cli/src/logging.rs
// ============================================================================
//
// LOGGING: Console and file logging for the PowerTrim CLI
//
// The core library only uses the `log` facade. This module installs the
// `fern` backend with two outputs:
// - stderr: `info` by default, `debug` with --verbose, level-coloured and
//   routed around the progress bar so it is not torn
// - a plain-text file `powertrim_<timestamp>.log` that always records `debug`
//
// AI-ASSISTANT-INFO: fern logger setup and timestamp helpers

use crate::terminal;
use anyhow::{Context, Result};
use log::{Level, LevelFilter};
use owo_colors::OwoColorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// Used to give each run its own log file.
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Name of the log file for a run started at `timestamp`.
pub fn log_file_name(timestamp: &str) -> String {
    format!("powertrim_{timestamp}.log")
}

fn console_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn console_line(level: Level, message: &str, color: bool) -> String {
    match (level, color) {
        (Level::Info, _) => message.to_string(),
        (Level::Error, true) => format!("{} {}", "ERROR".red().bold(), message),
        (Level::Warn, true) => format!("{} {}", "WARN".yellow().bold(), message),
        (Level::Debug | Level::Trace, true) => {
            format!("{} {}", level.as_str().dimmed(), message.dimmed())
        }
        (_, false) => format!("{} {}", level, message),
    }
}

fn console_dispatch(verbose: bool) -> fern::Dispatch {
    let color = console::colors_enabled_stderr();
    fern::Dispatch::new()
        .level(console_level(verbose))
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}",
                console_line(record.level(), &message.to_string(), color)
            ))
        })
        .chain(fern::Output::call(|record| {
            let line = record.args().to_string();
            terminal::suspend_progress(|| eprintln!("{line}"));
        }))
}

/// Installs console-only logging, used by commands that write no log file.
pub fn init_console(verbose: bool) -> Result<()> {
    console_dispatch(verbose)
        .apply()
        .context("Failed to initialise logging")
}

/// Installs console and file logging. Returns the path of the log file.
pub fn init(verbose: bool, log_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory '{}'", log_dir.display()))?;
    let log_path = log_dir.join(log_file_name(&get_timestamp()));
    let log_file = fern::log_file(&log_path)
        .with_context(|| format!("Failed to create log file '{}'", log_path.display()))?;

    let file_dispatch = fern::Dispatch::new()
        .level(LevelFilter::Debug)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .chain(console_dispatch(verbose))
        .chain(file_dispatch)
        .apply()
        .context("Failed to initialise logging")?;

    Ok(log_path)
}
