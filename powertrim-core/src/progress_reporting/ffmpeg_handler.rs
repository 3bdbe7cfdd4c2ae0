//! `FFmpeg` event handler
//!
//! Turns the event stream of one ffmpeg run into a progress fraction and a
//! bounded copy of the tool's error output for diagnostics.

use crate::error::MAX_DIAGNOSTIC_LINES;
use crate::utils::parse_ffmpeg_time;
use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress, LogLevel as FfmpegLogLevel};
use std::collections::VecDeque;

/// Handler for `FFmpeg` progress and log events
#[derive(Debug)]
pub struct FfmpegProgressHandler {
    duration: Option<f64>,
    last_fraction: f64,
    stderr_lines: VecDeque<String>,
}

impl FfmpegProgressHandler {
    /// Creates a handler; `duration` is the expected output length in seconds.
    #[must_use]
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration: duration.filter(|d| d.is_finite() && *d > 0.0),
            last_fraction: 0.0,
            stderr_lines: VecDeque::new(),
        }
    }

    /// Handles an `FFmpeg` event, returning the new fraction when progress advanced.
    pub fn handle_event(&mut self, event: &FfmpegEvent) -> Option<f64> {
        match event {
            FfmpegEvent::Progress(progress) => self.handle_progress(progress),
            FfmpegEvent::Log(level, message) => {
                self.handle_log(level, message);
                None
            }
            FfmpegEvent::Error(error) => {
                self.handle_error(error);
                None
            }
            _ => None,
        }
    }

    /// Captured error output, oldest line first.
    #[must_use]
    pub fn stderr_buffer(&self) -> String {
        self.stderr_lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn handle_progress(&mut self, progress: &FfmpegProgress) -> Option<f64> {
        let duration = self.duration?;
        let current_secs = parse_ffmpeg_time(&progress.time)?;
        let fraction = (current_secs / duration).clamp(0.0, 1.0);
        if fraction > self.last_fraction {
            log::trace!(
                "ffmpeg progress: {:.1}% ({:.2}s of {:.2}s, {:.2}x)",
                fraction * 100.0,
                current_secs,
                duration,
                progress.speed
            );
            self.last_fraction = fraction;
            Some(fraction)
        } else {
            None
        }
    }

    fn handle_log(&mut self, level: &FfmpegLogLevel, message: &str) {
        log::log!(target: "ffmpeg_log", log::Level::Debug, "{message}");
        // Info output (stream listings, cropdetect lines) is not diagnostic.
        if !matches!(level, FfmpegLogLevel::Info) {
            self.push_stderr(message);
        }
    }

    fn handle_error(&mut self, error: &str) {
        if is_non_critical_ffmpeg_error(error) {
            log::debug!("ffmpeg non-critical message: {error}");
        } else {
            log::warn!(target: "ffmpeg_log", "{error}");
        }
        self.push_stderr(error);
    }

    fn push_stderr(&mut self, line: &str) {
        if self.stderr_lines.len() == MAX_DIAGNOSTIC_LINES {
            self.stderr_lines.pop_front();
        }
        self.stderr_lines.push_back(line.to_string());
    }
}

/// Determines if an `FFmpeg` error message is non-critical.
///
/// These are `FFmpeg` messages that appear in stderr but don't indicate actual problems.
fn is_non_critical_ffmpeg_error(error: &str) -> bool {
    error.contains("deprecated pixel format")
        || error.contains("Timestamps are unset")
        || error.contains("does not match the corresponding codec")
        || error.contains("first frame is no keyframe")
        || error.contains("Non-monotonous DTS")
}
