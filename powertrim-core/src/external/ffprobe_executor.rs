//! FFprobe integration for media analysis.
//!
//! The production executor reads a file through the `ffprobe` crate and
//! converts the result into [`VideoMetadata`]. The trait lets the orchestrator
//! run against canned metadata in tests.

use crate::cancel::CancellationToken;
use crate::error::{ProbeError, ToolDiagnostic, ToolError, tool_start_error};
use crate::media::VideoMetadata;
use crossbeam_channel::RecvTimeoutError;
use ffprobe::{ConfigBuilder, FfProbeError};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// How often a running ffprobe checks for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Trait for extracting stream and container metadata from a source file.
pub trait FfprobeExecutor {
    /// Reads the metadata of `input_path`, giving up as soon as `cancel` fires.
    fn probe(
        &self,
        input_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<VideoMetadata, ProbeError>;
}

/// Runs the ffprobe binary at `ffprobe`.
#[derive(Debug, Clone)]
pub struct CommandFfprobeExecutor {
    ffprobe: PathBuf,
}

impl CommandFfprobeExecutor {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    fn map_ffprobe_error(&self, err: FfProbeError, input_path: &Path) -> ProbeError {
        match err {
            FfProbeError::Io(io_err) => tool_start_error("ffprobe", &self.ffprobe, io_err).into(),
            FfProbeError::Status(output) => {
                let diagnostic = ToolDiagnostic {
                    tool: "ffprobe".to_string(),
                    exit_code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                };
                log::error!("ffprobe failed for {}: {}", input_path.display(), diagnostic);
                ToolError::Failed(diagnostic).into()
            }
            FfProbeError::Deserialize(err) => ProbeError::Parse {
                path: input_path.to_path_buf(),
                reason: err.to_string(),
            },
            other => ProbeError::Parse {
                path: input_path.to_path_buf(),
                reason: format!("unknown ffprobe error: {other:?}"),
            },
        }
    }
}

impl FfprobeExecutor for CommandFfprobeExecutor {
    fn probe(
        &self,
        input_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<VideoMetadata, ProbeError> {
        if !input_path.is_file() {
            return Err(ProbeError::SourceMissing(input_path.to_path_buf()));
        }
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled("ffprobe".to_string()).into());
        }

        log::debug!("Running ffprobe on: {}", input_path.display());
        let config = ConfigBuilder::new().ffprobe_bin(&self.ffprobe).build();
        let path = input_path.to_path_buf();
        let (tx, rx) = crossbeam_channel::bounded(1);
        // The crate call blocks until ffprobe exits; a cancelled run is left
        // to finish on its own thread and its result is dropped.
        thread::Builder::new()
            .name("ffprobe".to_string())
            .spawn(move || {
                let _ = tx.send(ffprobe::ffprobe_config(config, &path));
            })
            .map_err(ToolError::Io)?;

        let result = loop {
            match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(result) => break result,
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        log::info!("ffprobe of {} cancelled", input_path.display());
                        return Err(ToolError::Cancelled("ffprobe".to_string()).into());
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ToolError::Io(std::io::Error::other(
                        "ffprobe thread exited without a result",
                    ))
                    .into());
                }
            }
        };

        let probed = result.map_err(|e| self.map_ffprobe_error(e, input_path))?;
        let metadata = VideoMetadata::from_ffprobe(input_path, &probed)?;
        log::debug!(
            "Probed {}: {} {} @ {} fps, {:.3}s, {} streams",
            input_path.display(),
            metadata.container,
            metadata.resolution_label(),
            metadata.frame_rate,
            metadata.duration,
            metadata.streams.len()
        );
        Ok(metadata)
    }
}
