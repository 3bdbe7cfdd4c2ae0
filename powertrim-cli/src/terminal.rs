// ============================================================================
// powertrim-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: UI Components and Styling
//
// This module provides the terminal output of the CLI: section headers,
// status lines, the job progress bar and the final summary. All styling
// lives here so commands only describe what to show.
//
// KEY COMPONENTS:
// - styling: Symbols, indentation and progress bar template
// - UI component functions: print_section, print_status, print_success, etc.
// - JobProgressBar: indicatif bar driven by the core's progress updates
//
// AI-ASSISTANT-INFO: Terminal UI components and styling for the CLI

// ---- External crate imports ----
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use powertrim_core::{JobProgress, JobState};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// STYLING CONSTANTS
// ============================================================================

/// Styling constants for terminal output
pub mod styling {
    // Symbols
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const PHASE_SYMBOL: &str = "◎";
    pub const ERROR_SYMBOL: &str = "✗";
    pub const CANCEL_SYMBOL: &str = "■";

    // Section formatting
    pub const SECTION_PREFIX: &str = "===== ";
    pub const SECTION_SUFFIX: &str = " =====";

    // Indentation
    pub const STATUS_INDENT: &str = "  ";
    pub const SUB_ITEM_INDENT: &str = "    ";

    // Width of status labels, so values line up
    pub const LABEL_WIDTH: usize = 14;

    pub const PROGRESS_TEMPLATE: &str =
        "{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}";
    pub const PROGRESS_CHARS: &str = "#>-";
}

// ============================================================================
// ACTIVE PROGRESS BAR
// ============================================================================

// Bar currently on screen. Log lines are printed around it.
static ACTIVE_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

/// Runs `print` with the active progress bar hidden, if there is one.
pub fn suspend_progress<F: FnOnce()>(print: F) {
    let active = ACTIVE_BAR.lock().ok().and_then(|guard| guard.clone());
    match active {
        Some(bar) => bar.suspend(print),
        None => print(),
    }
}

fn set_active_bar(bar: Option<ProgressBar>) {
    if let Ok(mut guard) = ACTIVE_BAR.lock() {
        *guard = bar;
    }
}

// ============================================================================
// UI COMPONENTS
// ============================================================================

/// Prints a section header.
pub fn print_section(title: &str) {
    suspend_progress(|| {
        println!();
        println!(
            "{}",
            format!(
                "{}{}{}",
                styling::SECTION_PREFIX,
                title.to_uppercase(),
                styling::SECTION_SUFFIX
            )
            .cyan()
            .bold()
        );
    });
}

/// Formats an aligned `label: value` line.
pub fn format_status(label: &str, value: &str) -> String {
    format!(
        "{}{:<width$} {}",
        styling::STATUS_INDENT,
        format!("{label}:"),
        value,
        width = styling::LABEL_WIDTH + 1
    )
}

/// Prints an aligned `label: value` line, optionally with the value in bold.
pub fn print_status(label: &str, value: &str, highlight: bool) {
    let line = if highlight {
        format_status(label, &value.bold().to_string())
    } else {
        format_status(label, value)
    };
    suspend_progress(|| println!("{line}"));
}

pub fn print_sub_item(message: &str) {
    suspend_progress(|| println!("{}{}", styling::SUB_ITEM_INDENT, message));
}

pub fn print_processing(message: &str) {
    suspend_progress(|| println!("{} {}", styling::PROCESSING_SYMBOL.cyan(), message));
}

pub fn print_success(message: &str) {
    suspend_progress(|| {
        println!("{} {}", styling::SUCCESS_SYMBOL.green().bold(), message.green())
    });
}

pub fn print_cancelled(message: &str) {
    suspend_progress(|| println!("{} {}", styling::CANCEL_SYMBOL.yellow().bold(), message.yellow()));
}

/// Prints an error block with an optional suggestion.
pub fn print_error(title: &str, message: &str, suggestion: Option<&str>) {
    suspend_progress(|| {
        eprintln!("{} {}", styling::ERROR_SYMBOL.red().bold(), title.red().bold());
        for line in message.lines() {
            eprintln!("{}{}", styling::SUB_ITEM_INDENT, line);
        }
        if let Some(suggestion) = suggestion {
            eprintln!("{}{}", styling::SUB_ITEM_INDENT, suggestion.dimmed());
        }
    });
}

// ============================================================================
// JOB PROGRESS BAR
// ============================================================================

/// Text shown next to the bar for an update.
pub fn phase_message(progress: &JobProgress) -> String {
    match progress.state {
        JobState::Extracting { .. } => format!(
            "{} {} ({:.0}%)",
            styling::PHASE_SYMBOL,
            progress.phase,
            progress.segment_fraction * 100.0
        ),
        _ => format!("{} {}", styling::PHASE_SYMBOL, progress.phase),
    }
}

/// Progress bar for one export job, in percent of the whole job.
pub struct JobProgressBar {
    bar: ProgressBar,
}

impl JobProgressBar {
    /// Creates the bar. It stays hidden when stderr is not a terminal.
    pub fn new() -> Self {
        let bar = if console::Term::stderr().is_term() {
            ProgressBar::new(100)
        } else {
            ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden())
        };
        let style = ProgressStyle::with_template(styling::PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(styling::PROGRESS_CHARS);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        set_active_bar(Some(bar.clone()));
        Self { bar }
    }

    pub fn update(&self, progress: &JobProgress) {
        let position = (progress.overall.clamp(0.0, 1.0) * 100.0).round() as u64;
        // The core never reports a lower value; the bar must not move back either
        if position > self.bar.position() {
            self.bar.set_position(position);
        }
        self.bar.set_message(phase_message(progress));
        if progress.state.is_terminal() {
            self.bar.disable_steady_tick();
        }
    }

    /// Removes the bar from the screen.
    pub fn finish(&self) {
        set_active_bar(None);
        self.bar.finish_and_clear();
    }
}

impl Default for JobProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for JobProgressBar {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(state: JobState, phase: &str, segment_fraction: f64) -> JobProgress {
        JobProgress {
            overall: 0.5,
            segment_index: 1,
            segment_fraction,
            state,
            phase: phase.to_string(),
        }
    }

    #[test]
    fn test_format_status_aligns_values() {
        let a = format_status("Mode", "copy");
        let b = format_status("Output folder", "/tmp");
        assert_eq!(a.find("copy"), b.find("/tmp"));
        assert!(a.starts_with(styling::STATUS_INDENT));
    }

    #[test]
    fn test_phase_message_shows_segment_percentage_while_extracting() {
        let update = progress(
            JobState::Extracting { index: 2, total: 3 },
            "Exporting clip 2 of 3",
            0.25,
        );
        assert_eq!(phase_message(&update), "◎ Exporting clip 2 of 3 (25%)");

        let update = progress(JobState::Merging, "Merging clips", 0.0);
        assert_eq!(phase_message(&update), "◎ Merging clips");
    }

    #[test]
    fn test_suspend_without_bar_runs_closure() {
        let mut ran = false;
        suspend_progress(|| ran = true);
        assert!(ran);
    }
}
