// ============================================================================
// powertrim-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg, ffprobe and smartcut
//
// This module encapsulates every external process the pipeline runs. Each
// tool sits behind a trait so the orchestrator can be driven by mocks in
// tests and by real processes in production.
//
// KEY COMPONENTS:
// - FfmpegSpawner / FfmpegProcess: ffmpeg via ffmpeg-sidecar
// - FfprobeExecutor: metadata probing
// - SmartCutExecutor: frame-accurate cuts by the smartcut tool
// - Tool resolution and dependency checking

// ---- Internal crate imports ----
use crate::error::ToolError;

// ---- Standard library imports ----
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Contains traits and implementations for executing ffmpeg commands
pub mod ffmpeg_executor;

/// Contains traits and implementations for executing ffprobe commands
pub mod ffprobe_executor;

/// Contains traits and implementations for running smartcut
pub mod smartcut_executor;

/// Mock implementations of the tool traits for tests
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{
    FfmpegProcess, FfmpegSpawner, ProcessExit, SidecarProcess, SidecarSpawner, run_ffmpeg,
};
pub use ffprobe_executor::{CommandFfprobeExecutor, FfprobeExecutor};
pub use smartcut_executor::{CommandSmartCutExecutor, SmartCutExecutor};

// ============================================================================
// TOOL RESOLUTION
// ============================================================================

/// Locates an external tool.
///
/// Looks in a `bin/` directory next to the running executable first, then on
/// `PATH`. Falls back to the bare name so the OS reports a missing tool when
/// it is first spawned.
pub fn resolve_tool(name: &str) -> PathBuf {
    let exe_name = format!("{name}{}", env::consts::EXE_SUFFIX);

    let bundled = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("bin").join(&exe_name)))
        .filter(|candidate| candidate.is_file());
    if let Some(path) = bundled {
        log::debug!("Using bundled {}: {}", name, path.display());
        return path;
    }

    if let Some(path) = find_in_path(&exe_name) {
        log::debug!("Found {} on PATH: {}", name, path.display());
        return path;
    }

    PathBuf::from(name)
}

fn find_in_path(exe_name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(exe_name))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks that an external tool can be started.
///
/// Runs the tool with `probe_arg` (e.g. `-version`) and discards its output.
/// Only the ability to start the process matters; the exit status is ignored.
pub fn check_dependency(tool: &Path, probe_arg: &str) -> Result<(), ToolError> {
    let result = Command::new(tool)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", tool.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", tool.display());
            Err(ToolError::NotFound(tool.to_path_buf()))
        }
        Err(e) => {
            log::error!(
                "Failed to start dependency check command '{}': {}",
                tool.display(),
                e
            );
            Err(ToolError::Start {
                tool: tool.display().to_string(),
                source: e,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolvable_tool_falls_back_to_bare_name() {
        let name = "powertrim-surely-missing-tool";
        assert_eq!(resolve_tool(name), PathBuf::from(name));
    }

    #[test]
    fn missing_dependency_is_reported() {
        let err = check_dependency(Path::new("/nonexistent/powertrim-tool"), "-version")
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
