// ============================================================================
// powertrim-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module provides abstractions for spawning and interacting with FFmpeg
// processes, plus `run_ffmpeg`, the single entry point the pipeline uses to
// execute a command with progress tracking, diagnostics and cancellation.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner / SidecarProcess: Implementation using ffmpeg-sidecar

use crate::cancel::{CancellationToken, ProcessKiller};
use crate::error::{ToolDiagnostic, ToolError, tool_start_error};
use crate::progress_reporting::ffmpeg_handler::FfmpegProgressHandler;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit state of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub success: bool,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    #[must_use]
    pub fn failure(code: Option<i32>) -> Self {
        Self {
            success: false,
            code,
        }
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

// --- FFmpeg Execution Abstraction ---

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Processes events from the running command using a provided handler closure.
    fn handle_events<F>(&mut self, handler: F) -> Result<(), ToolError>
    where
        F: FnMut(FfmpegEvent) -> Result<(), ToolError>;

    /// Waits for the command to complete and returns its exit state.
    fn wait(&mut self) -> Result<ProcessExit, ToolError>;

    /// Handle that terminates this process from another thread.
    fn killer(&self) -> Arc<dyn ProcessKiller>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;
    /// Spawns the ffmpeg command, consuming the command object.
    fn spawn(&self, cmd: FfmpegCommand) -> Result<Self::Process, ToolError>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

type SharedChild = Arc<Mutex<FfmpegChild>>;

fn lock_child(child: &SharedChild) -> MutexGuard<'_, FfmpegChild> {
    match child.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
///
/// The child sits behind a mutex that is only held for short calls, so a
/// [`SidecarKiller`] can terminate it while events are being read.
pub struct SidecarProcess {
    child: SharedChild,
}

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> Result<(), ToolError>
    where
        F: FnMut(FfmpegEvent) -> Result<(), ToolError>,
    {
        let iterator = lock_child(&self.child).iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            ToolError::Io(io::Error::other(e.to_string()))
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> Result<ProcessExit, ToolError> {
        loop {
            if let Some(status) = lock_child(&self.child).as_inner_mut().try_wait()? {
                return Ok(status.into());
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    fn killer(&self) -> Arc<dyn ProcessKiller> {
        Arc::new(SidecarKiller(Arc::clone(&self.child)))
    }
}

struct SidecarKiller(SharedChild);

impl ProcessKiller for SidecarKiller {
    fn kill(&self) -> io::Result<()> {
        let mut child = lock_child(&self.0);
        // Already exited: nothing to kill.
        if child.as_inner_mut().try_wait()?.is_some() {
            return Ok(());
        }
        child.kill()
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> Result<Self::Process, ToolError> {
        let program = PathBuf::from(cmd.as_inner().get_program());
        cmd.spawn()
            .map(|child| SidecarProcess {
                child: Arc::new(Mutex::new(child)),
            })
            .map_err(|e| tool_start_error("ffmpeg", &program, e))
    }
}

/// Renders the arguments of a command for logging.
#[must_use]
pub fn command_line(cmd: &FfmpegCommand) -> String {
    cmd.get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs one ffmpeg command to completion.
///
/// Every event goes through `handler` first (stderr capture and progress);
/// `on_event` then sees the event together with any new progress fraction.
/// The process is attached to `cancel` while it runs.
pub fn run_ffmpeg<S, F>(
    spawner: &S,
    cmd: FfmpegCommand,
    tool: &str,
    cancel: &CancellationToken,
    handler: &mut FfmpegProgressHandler,
    mut on_event: F,
) -> Result<(), ToolError>
where
    S: FfmpegSpawner,
    F: FnMut(&FfmpegEvent, Option<f64>),
{
    if cancel.is_cancelled() {
        return Err(ToolError::Cancelled(tool.to_string()));
    }

    log::debug!("Running {}: ffmpeg {}", tool, command_line(&cmd));

    let mut process = spawner.spawn(cmd)?;
    let _guard = cancel.attach(process.killer());

    process.handle_events(|event| {
        let fraction = handler.handle_event(&event);
        on_event(&event, fraction);
        Ok(())
    })?;
    let exit = process.wait()?;

    if cancel.is_cancelled() {
        log::debug!("{} terminated by cancellation", tool);
        return Err(ToolError::Cancelled(tool.to_string()));
    }
    if !exit.success {
        log::error!("{} failed with exit code {:?}", tool, exit.code);
        return Err(ToolError::Failed(ToolDiagnostic {
            tool: tool.to_string(),
            exit_code: exit.code,
            stderr: handler.stderr_buffer(),
        }));
    }
    Ok(())
}
