//! Job progress reporting.
//!
//! The orchestrator owns one [`ProgressTracker`] per job. The tracker keeps
//! the overall fraction monotonic, holds it below 1.0 until the job is done,
//! and forwards each update to a caller-supplied [`ProgressReporter`].
//!
//! Reporters must never block the worker: [`ChannelReporter`] uses a bounded
//! channel and drops updates the consumer has not caught up with.

pub mod ffmpeg_handler;

use crossbeam_channel::{Sender, TrySendError};
use std::fmt;

/// Highest overall fraction reported before the job reaches `Done`.
const MAX_UNFINISHED_FRACTION: f64 = 0.999;

/// Share of overall progress given to extraction when a merge follows.
const EXTRACTION_SHARE_WITH_MERGE: f64 = 0.9;

/// State of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Probing,
    CropDetecting,
    Mapping,
    /// Extracting segment `index` (1-based) of `total`.
    Extracting { index: usize, total: usize },
    Merging,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Idle => f.write_str("Idle"),
            JobState::Probing => f.write_str("Reading media information"),
            JobState::CropDetecting => f.write_str("Detecting black bars"),
            JobState::Mapping => f.write_str("Mapping tracks"),
            JobState::Extracting { index, total } => {
                write!(f, "Exporting clip {index} of {total}")
            }
            JobState::Merging => f.write_str("Merging clips"),
            JobState::Done => f.write_str("Done"),
            JobState::Failed => f.write_str("Failed"),
            JobState::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// One progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct JobProgress {
    /// Non-decreasing fraction of the whole job in `[0, 1]`.
    pub overall: f64,
    /// 1-based segment being processed; 0 outside extraction.
    pub segment_index: usize,
    /// Fraction of the current segment in `[0, 1]`.
    pub segment_fraction: f64,
    pub state: JobState,
    /// Human-readable phase label.
    pub phase: String,
}

/// Sink for progress updates.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &JobProgress);
}

/// Discards all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _progress: &JobProgress) {}
}

/// Sends updates into a bounded channel without blocking.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: Sender<JobProgress>,
}

impl ChannelReporter {
    #[must_use]
    pub fn new(sender: Sender<JobProgress>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, progress: &JobProgress) {
        match self.sender.try_send(progress.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::trace!("Progress channel full; dropping update");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for std::sync::Arc<R> {
    fn report(&self, progress: &JobProgress) {
        (**self).report(progress);
    }
}

/// Computes and emits the progress of one job.
pub struct ProgressTracker<'a> {
    reporter: &'a dyn ProgressReporter,
    total_segments: usize,
    extraction_share: f64,
    overall: f64,
    segment_index: usize,
    segment_fraction: f64,
    state: JobState,
    last_logged_decile: i32,
}

impl<'a> ProgressTracker<'a> {
    #[must_use]
    pub fn new(reporter: &'a dyn ProgressReporter, total_segments: usize, merge_planned: bool) -> Self {
        Self {
            reporter,
            total_segments: total_segments.max(1),
            extraction_share: if merge_planned {
                EXTRACTION_SHARE_WITH_MERGE
            } else {
                1.0
            },
            overall: 0.0,
            segment_index: 0,
            segment_fraction: 0.0,
            state: JobState::Idle,
            last_logged_decile: 0,
        }
    }

    #[must_use]
    pub fn overall(&self) -> f64 {
        self.overall
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Moves to a new state and emits an update.
    pub fn enter(&mut self, state: JobState) {
        log::debug!("Job state: {:?} -> {:?}", self.state, state);
        self.state = state;
        match state {
            JobState::Extracting { index, .. } => {
                self.segment_index = index;
                self.segment_fraction = 0.0;
                self.advance(self.extraction_point(index, 0.0));
            }
            JobState::Merging => {
                self.segment_index = 0;
                self.segment_fraction = 0.0;
                self.advance(self.extraction_share);
            }
            JobState::Done => {
                self.overall = 1.0;
                self.segment_fraction = 1.0;
            }
            _ => {}
        }
        self.emit();
    }

    /// Reports the fraction of the segment currently being extracted.
    pub fn segment_progress(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction <= self.segment_fraction {
            return;
        }
        self.segment_fraction = fraction;
        self.advance(self.extraction_point(self.segment_index, fraction));
        self.emit();
    }

    /// Marks the current segment as finished, whether it succeeded or not.
    pub fn segment_finished(&mut self) {
        self.segment_fraction = 1.0;
        self.advance(self.extraction_point(self.segment_index, 1.0));
        self.emit();
    }

    /// Reports merge progress.
    pub fn merge_progress(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.segment_fraction = fraction;
        self.advance(self.extraction_share + (1.0 - self.extraction_share) * fraction);
        self.emit();
    }

    fn extraction_point(&self, index: usize, fraction: f64) -> f64 {
        let completed = index.saturating_sub(1) as f64;
        self.extraction_share * (completed + fraction) / self.total_segments as f64
    }

    fn advance(&mut self, candidate: f64) {
        let capped = candidate.min(MAX_UNFINISHED_FRACTION);
        if capped > self.overall {
            self.overall = capped;
        }
    }

    fn emit(&mut self) {
        let decile = (self.overall * 10.0).floor() as i32;
        if decile > self.last_logged_decile {
            self.last_logged_decile = decile;
            log::info!(
                target: "powertrim::progress",
                "Export progress: {:.0}% ({})",
                self.overall * 100.0,
                self.state
            );
        }
        self.reporter.report(&JobProgress {
            overall: self.overall,
            segment_index: self.segment_index,
            segment_fraction: self.segment_fraction,
            state: self.state,
            phase: self.state.to_string(),
        });
    }
}
