//! Execution of the external `smartcut` tool.
//!
//! smartcut performs frame-accurate cuts while re-encoding only the GOPs at
//! the cut points. It reports no machine-readable progress, so callers treat
//! a run as binary. The child is attached to the cancellation token so a
//! cancel request kills it right away.

use crate::cancel::{CancellationToken, ProcessKiller};
use crate::error::{MAX_DIAGNOSTIC_LINES, ToolDiagnostic, ToolError, tool_start_error};
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Trait for running one smartcut extraction.
pub trait SmartCutExecutor {
    /// Cuts `[start_secs, end_secs)` of `input` into `output`.
    fn cut(
        &self,
        input: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
        cancel: &CancellationToken,
    ) -> Result<(), ToolError>;
}

/// Builds the smartcut argument list.
#[must_use]
pub fn smartcut_args(input: &Path, output: &Path, start_secs: f64, end_secs: f64) -> Vec<OsString> {
    vec![
        input.as_os_str().to_os_string(),
        output.as_os_str().to_os_string(),
        OsString::from("--keep"),
        OsString::from(format!("{start_secs:.6},{end_secs:.6}")),
    ]
}

type SharedChild = Arc<Mutex<Child>>;

fn lock_child(child: &SharedChild) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SmartCutKiller(SharedChild);

impl ProcessKiller for SmartCutKiller {
    fn kill(&self) -> io::Result<()> {
        let mut child = lock_child(&self.0);
        if child.try_wait()?.is_some() {
            return Ok(());
        }
        child.kill()
    }
}

/// Runs the smartcut binary at `smartcut`.
#[derive(Debug, Clone)]
pub struct CommandSmartCutExecutor {
    smartcut: PathBuf,
}

impl CommandSmartCutExecutor {
    pub fn new(smartcut: impl Into<PathBuf>) -> Self {
        Self {
            smartcut: smartcut.into(),
        }
    }
}

impl SmartCutExecutor for CommandSmartCutExecutor {
    fn cut(
        &self,
        input: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
        cancel: &CancellationToken,
    ) -> Result<(), ToolError> {
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled("smartcut".to_string()));
        }

        let args = smartcut_args(input, output, start_secs, end_secs);
        log::debug!("Running smartcut: {} {:?}", self.smartcut.display(), args);

        let mut child = Command::new(&self.smartcut)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| tool_start_error("smartcut", &self.smartcut, e))?;

        // Drain stderr on a helper thread so a chatty child cannot block on a full pipe.
        let stderr_handle = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let mut lines: Vec<String> = Vec::new();
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    log::debug!(target: "smartcut_log", "{line}");
                    lines.push(line);
                    if lines.len() > MAX_DIAGNOSTIC_LINES {
                        lines.remove(0);
                    }
                }
                lines.join("\n")
            })
        });

        let child = Arc::new(Mutex::new(child));
        let _active = cancel.attach(Arc::new(SmartCutKiller(Arc::clone(&child))));

        // try_wait keeps the lock free for the killer between polls.
        let status = loop {
            if let Some(status) = lock_child(&child).try_wait()? {
                break status;
            }
            thread::sleep(POLL_INTERVAL);
        };

        // A grandchild may still hold stderr open, so a cancelled run does
        // not wait for the drain thread.
        if cancel.is_cancelled() {
            log::debug!("smartcut stopped after cancellation");
            return Err(ToolError::Cancelled("smartcut".to_string()));
        }
        let stderr = stderr_handle
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            log::error!("smartcut failed with status {}", status);
            return Err(ToolError::Failed(ToolDiagnostic {
                tool: "smartcut".to_string(),
                exit_code: status.code(),
                stderr,
            }));
        }
        Ok(())
    }
}
