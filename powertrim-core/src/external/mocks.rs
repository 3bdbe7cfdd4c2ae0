// powertrim-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for unit tests and when the "test-mocks" feature is enabled.

use super::*;
use crate::cancel::{CancellationToken, ProcessKiller};
use crate::error::{ProbeError, ToolDiagnostic, ToolError};
use crate::media::{FrameRate, Stream, StreamKind, VideoMetadata};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const DUMMY_CONTENT: &[u8] = b"mock media payload";

/// Builds a progress event at the given `HH:MM:SS.ss` position.
pub fn progress_event(time: &str) -> FfmpegEvent {
    FfmpegEvent::Progress(FfmpegProgress {
        frame: 0,
        fps: 0.0,
        q: 0.0,
        size_kb: 0,
        time: time.to_string(),
        bitrate_kbps: 0.0,
        speed: 1.0,
        raw_log_message: String::new(),
    })
}

/// Metadata for a 25 fps 1920x1080 Matroska source of ten minutes.
pub fn sample_metadata(streams: Vec<Stream>) -> VideoMetadata {
    VideoMetadata {
        path: PathBuf::from("/media/source.mkv"),
        container: "matroska,webm".to_string(),
        duration: 600.0,
        frame_rate: FrameRate::new(25, 1).expect("25/1 is a valid frame rate"),
        width: 1920,
        height: 1080,
        streams,
    }
}

/// One video stream, a Japanese and an English audio stream and an English subtitle.
pub fn sample_streams() -> Vec<Stream> {
    vec![
        Stream::new(0, StreamKind::Video, "h264"),
        Stream::new(1, StreamKind::Audio, "aac").with_language("jpn"),
        Stream::new(2, StreamKind::Audio, "ac3").with_language("eng"),
        Stream::new(3, StreamKind::Subtitle, "subrip").with_language("eng"),
    ]
}

fn write_dummy_output(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::error!("Mock failed to create parent dir {:?}: {}", parent, e);
        }
    }
    match std::fs::write(path, content) {
        Ok(()) => log::info!("Mock created dummy output file: {:?}", path),
        Err(e) => log::error!("Mock failed to create dummy output file {:?}: {}", path, e),
    }
}

// ---- ffmpeg ----

struct MockKiller(Arc<AtomicBool>);

impl ProcessKiller for MockKiller {
    fn kill(&self) -> std::io::Result<()> {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock implementation of FfmpegProcess.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    /// Events to emit when handle_events is called.
    pub events_to_emit: Vec<FfmpegEvent>,
    /// Exit state to return when wait is called.
    pub exit: ProcessExit,
    /// Token cancelled after all events were emitted.
    pub cancel_after_events: Option<CancellationToken>,
    killed: Arc<AtomicBool>,
}

impl MockFfmpegProcess {
    pub fn new(events_to_emit: Vec<FfmpegEvent>, exit: ProcessExit) -> Self {
        Self {
            events_to_emit,
            exit,
            cancel_after_events: None,
            killed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> Result<(), ToolError>
    where
        F: FnMut(FfmpegEvent) -> Result<(), ToolError>,
    {
        for event in self.events_to_emit.clone() {
            handler(event)?;
        }
        if let Some(token) = &self.cancel_after_events {
            token.cancel();
        }
        Ok(())
    }

    fn wait(&mut self) -> Result<ProcessExit, ToolError> {
        if self.killed.load(Ordering::SeqCst) {
            Ok(ProcessExit::failure(None))
        } else {
            Ok(self.exit)
        }
    }

    fn killer(&self) -> Arc<dyn ProcessKiller> {
        Arc::new(MockKiller(Arc::clone(&self.killed)))
    }
}

/// Represents an expected ffmpeg command call and its mock result.
pub struct MockFfmpegExpectation {
    pub arg_pattern: String,
    pub result: Result<MockFfmpegProcess, ToolError>,
    /// Content written to the command's output path, if any.
    pub dummy_output: Option<&'static [u8]>,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Arc<Mutex<Vec<MockFfmpegExpectation>>>,
    received_calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_expectation(
        &self,
        arg_pattern: &str,
        result: Result<MockFfmpegProcess, ToolError>,
        dummy_output: Option<&'static [u8]>,
    ) {
        if let Ok(mut expectations) = self.expectations.lock() {
            expectations.push(MockFfmpegExpectation {
                arg_pattern: arg_pattern.to_string(),
                result,
                dummy_output,
            });
        }
    }

    pub fn add_success_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        create_dummy_output: bool,
    ) {
        let process = MockFfmpegProcess::new(events, ProcessExit::success());
        self.add_expectation(
            arg_pattern,
            Ok(process),
            create_dummy_output.then_some(DUMMY_CONTENT),
        );
    }

    /// Succeeds but leaves a zero-length output file.
    pub fn add_empty_output_expectation(&self, arg_pattern: &str) {
        let process = MockFfmpegProcess::new(Vec::new(), ProcessExit::success());
        self.add_expectation(arg_pattern, Ok(process), Some(&b""[..]));
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: ToolError) {
        self.add_expectation(arg_pattern, Err(error), None);
    }

    pub fn add_exit_error_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        exit_code: i32,
    ) {
        let process = MockFfmpegProcess::new(events, ProcessExit::failure(Some(exit_code)));
        self.add_expectation(arg_pattern, Ok(process), None);
    }

    /// Writes a partial output, then cancels `token` while the process runs.
    pub fn add_cancel_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        token: CancellationToken,
    ) {
        let mut process = MockFfmpegProcess::new(events, ProcessExit::success());
        process.cancel_after_events = Some(token);
        self.add_expectation(arg_pattern, Ok(process), Some(DUMMY_CONTENT));
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> Result<Self::Process, ToolError> {
        let args: Vec<String> = cmd
            .get_args()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        if let Ok(mut calls) = self.received_calls.lock() {
            calls.push(args.clone());
        }

        let expectation = self.expectations.lock().ok().and_then(|mut expectations| {
            let index = expectations
                .iter()
                .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)))?;
            Some(expectations.remove(index))
        });

        let Some(expectation) = expectation else {
            log::error!("MockFfmpegSpawner: no expectation matched args {:?}", args);
            return Err(ToolError::Failed(ToolDiagnostic {
                tool: "mock ffmpeg".to_string(),
                exit_code: Some(1),
                stderr: format!("unexpected ffmpeg call: {}", args.join(" ")),
            }));
        };
        log::info!(
            "MockFfmpegSpawner: Matched expectation with pattern '{}'",
            expectation.arg_pattern
        );

        let process = expectation.result?;
        if let (Some(content), Some(output)) = (expectation.dummy_output, args.last()) {
            write_dummy_output(Path::new(output), content);
        }
        Ok(process)
    }
}

// ---- ffprobe ----

/// Mock implementation of FfprobeExecutor returning canned metadata.
#[derive(Clone)]
pub struct MockFfprobeExecutor {
    metadata: Option<VideoMetadata>,
    error: Arc<Mutex<Option<ProbeError>>>,
    /// Token cancelled while the mock runs, as a user pressing `q` would.
    cancel_during: Option<CancellationToken>,
}

impl MockFfprobeExecutor {
    pub fn with_metadata(metadata: VideoMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            error: Arc::new(Mutex::new(None)),
            cancel_during: None,
        }
    }

    pub fn with_error(error: ProbeError) -> Self {
        Self {
            metadata: None,
            error: Arc::new(Mutex::new(Some(error))),
            cancel_during: None,
        }
    }

    /// Cancels `token` while running and then reports cancellation.
    pub fn cancelling(metadata: VideoMetadata, token: CancellationToken) -> Self {
        Self {
            cancel_during: Some(token),
            ..Self::with_metadata(metadata)
        }
    }
}

impl FfprobeExecutor for MockFfprobeExecutor {
    fn probe(
        &self,
        input_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<VideoMetadata, ProbeError> {
        if let Some(token) = &self.cancel_during {
            token.cancel();
        }
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled("mock ffprobe".to_string()).into());
        }
        if let Some(error) = self.error.lock().ok().and_then(|mut e| e.take()) {
            return Err(error);
        }
        match &self.metadata {
            Some(metadata) => {
                let mut metadata = metadata.clone();
                metadata.path = input_path.to_path_buf();
                Ok(metadata)
            }
            None => Err(ProbeError::Parse {
                path: input_path.to_path_buf(),
                reason: "mock has no metadata".to_string(),
            }),
        }
    }
}

// ---- smartcut ----

/// Scripted result of one smartcut call.
pub enum SmartCutOutcome {
    /// Writes the output file and succeeds.
    Succeed,
    /// Exits with the given code and stderr.
    Fail(i32, String),
    /// Writes a partial output, cancels the token and reports cancellation.
    CancelDuring(CancellationToken),
}

/// Mock implementation of SmartCutExecutor. Succeeds once its script runs out.
#[derive(Clone, Default)]
pub struct MockSmartCutExecutor {
    outcomes: Arc<Mutex<VecDeque<SmartCutOutcome>>>,
    calls: Arc<Mutex<Vec<(PathBuf, f64, f64)>>>,
}

impl MockSmartCutExecutor {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push_outcome(&self, outcome: SmartCutOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
    }

    /// Output path and keep range of each call.
    pub fn calls(&self) -> Vec<(PathBuf, f64, f64)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl SmartCutExecutor for MockSmartCutExecutor {
    fn cut(
        &self,
        _input: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
        cancel: &CancellationToken,
    ) -> Result<(), ToolError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((output.to_path_buf(), start_secs, end_secs));
        }
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled("smartcut".to_string()));
        }
        let outcome = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut o| o.pop_front())
            .unwrap_or(SmartCutOutcome::Succeed);
        match outcome {
            SmartCutOutcome::Succeed => {
                write_dummy_output(output, DUMMY_CONTENT);
                Ok(())
            }
            SmartCutOutcome::Fail(code, stderr) => Err(ToolError::Failed(ToolDiagnostic {
                tool: "smartcut".to_string(),
                exit_code: Some(code),
                stderr,
            })),
            SmartCutOutcome::CancelDuring(token) => {
                write_dummy_output(output, DUMMY_CONTENT);
                token.cancel();
                Err(ToolError::Cancelled("smartcut".to_string()))
            }
        }
    }
}
