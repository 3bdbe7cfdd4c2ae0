//! Background execution of export jobs.
//!
//! [`spawn_job`] runs one job on a dedicated thread. Progress arrives on a
//! bounded channel that drops updates instead of blocking the worker; the
//! terminal [`JobOutcome`] is delivered exactly once on a second channel.

use crate::cancel::CancellationToken;
use crate::config::ExportSettings;
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegSpawner, FfprobeExecutor, SmartCutExecutor};
use crate::media::Segment;
use crate::processing::{JobOrchestrator, JobOutcome};
use crate::progress_reporting::{ChannelReporter, JobProgress};
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use std::thread::{self, JoinHandle};

/// Progress updates buffered before new ones are dropped.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Handle to a job running on a worker thread.
pub struct JobHandle {
    progress: Receiver<JobProgress>,
    outcome: Receiver<JobOutcome>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    /// Receiver for progress updates. Disconnects when the job ends.
    #[must_use]
    pub fn progress(&self) -> &Receiver<JobProgress> {
        &self.progress
    }

    /// Receiver for the single terminal outcome.
    #[must_use]
    pub fn outcome(&self) -> &Receiver<JobOutcome> {
        &self.outcome
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests cancellation. The running tool is killed and the job ends as cancelled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns the outcome if the job has already finished.
    pub fn try_outcome(&self) -> Option<JobOutcome> {
        match self.outcome.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until the job ends and returns its outcome.
    pub fn wait(mut self) -> JobOutcome {
        let outcome = self.outcome.recv();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Export worker thread panicked");
            }
        }
        outcome.unwrap_or_else(|_| JobOutcome::Failed {
            error: CoreError::Io(std::io::Error::other(
                "export worker ended without reporting an outcome",
            )),
            produced: Vec::new(),
        })
    }
}

/// Starts `orchestrator` on a new thread for `settings` and `segments`.
pub fn spawn_job<S, P, C>(
    orchestrator: JobOrchestrator<S, P, C>,
    settings: ExportSettings,
    segments: Vec<Segment>,
) -> CoreResult<JobHandle>
where
    S: FfmpegSpawner + Send + 'static,
    P: FfprobeExecutor + Send + 'static,
    C: SmartCutExecutor + Send + 'static,
{
    spawn_job_with_token(orchestrator, settings, segments, CancellationToken::new())
}

/// Like [`spawn_job`], observing an existing cancellation token.
pub fn spawn_job_with_token<S, P, C>(
    orchestrator: JobOrchestrator<S, P, C>,
    settings: ExportSettings,
    segments: Vec<Segment>,
    cancel: CancellationToken,
) -> CoreResult<JobHandle>
where
    S: FfmpegSpawner + Send + 'static,
    P: FfprobeExecutor + Send + 'static,
    C: SmartCutExecutor + Send + 'static,
{
    let (progress_tx, progress_rx) = bounded(PROGRESS_CHANNEL_CAPACITY);
    let (outcome_tx, outcome_rx) = bounded(1);
    let worker_cancel = cancel.clone();

    let thread = thread::Builder::new()
        .name("powertrim-job".to_string())
        .spawn(move || {
            let reporter = ChannelReporter::new(progress_tx);
            let outcome = orchestrator.run(&settings, &segments, &reporter, &worker_cancel);
            if outcome_tx.send(outcome).is_err() {
                log::debug!("Job outcome dropped; handle no longer listening");
            }
        })?;

    Ok(JobHandle {
        progress: progress_rx,
        outcome: outcome_rx,
        cancel,
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolPaths;
    use crate::external::mocks::{
        MockFfmpegSpawner, MockFfprobeExecutor, MockSmartCutExecutor, sample_metadata,
        sample_streams,
    };
    use crate::progress_reporting::JobState;
    use tempfile::tempdir;

    fn tools() -> ToolPaths {
        ToolPaths {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
            smartcut: "smartcut".into(),
        }
    }

    #[test]
    fn worker_delivers_progress_and_outcome() {
        let out = tempdir().unwrap();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation("source_segment_001.mkv", vec![], true);
        let orchestrator = JobOrchestrator::new(
            spawner,
            MockFfprobeExecutor::with_metadata(sample_metadata(sample_streams())),
            MockSmartCutExecutor::new(),
            tools(),
        );
        let mut settings = ExportSettings::new("/media/source.mkv".into(), out.path().to_path_buf());
        settings.tools = tools();

        let handle = spawn_job(orchestrator, settings, vec![Segment::new(0, 25)]).unwrap();
        let progress = handle.progress().clone();
        let outcome = handle.wait();

        assert_eq!(outcome.exit_code(), 0);
        let states: Vec<JobState> = progress.try_iter().map(|p| p.state).collect();
        assert_eq!(states.first(), Some(&JobState::Probing));
        assert_eq!(states.last(), Some(&JobState::Done));
    }

    #[test]
    fn pre_cancelled_token_ends_job_as_cancelled() {
        let out = tempdir().unwrap();
        let orchestrator = JobOrchestrator::new(
            MockFfmpegSpawner::new(),
            MockFfprobeExecutor::with_metadata(sample_metadata(sample_streams())),
            MockSmartCutExecutor::new(),
            tools(),
        );
        let mut settings = ExportSettings::new("/media/source.mkv".into(), out.path().to_path_buf());
        settings.tools = tools();
        let token = CancellationToken::new();
        token.cancel();

        let handle =
            spawn_job_with_token(orchestrator, settings, vec![Segment::new(0, 25)], token).unwrap();
        assert!(handle.cancellation_token().is_cancelled());
        let outcome = handle.wait();
        assert!(matches!(outcome, JobOutcome::Cancelled { ref produced } if produced.is_empty()));
        assert_eq!(outcome.exit_code(), 130);
    }
}
