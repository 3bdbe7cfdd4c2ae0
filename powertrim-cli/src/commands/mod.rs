//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Module containing the implementation of the `export` command.
/// This command cuts segments of a source into clips or one merged file.
pub mod export;

/// Module containing the implementation of the `probe` command.
pub mod probe;

use crate::cli::ToolArgs;
use crate::CliResult;
use anyhow::Context;
use powertrim_core::{ToolPaths, check_dependency};

impl ToolArgs {
    /// Replaces the resolved tool paths with the ones given explicitly.
    pub fn apply(&self, tools: &mut ToolPaths) {
        if let Some(ffmpeg) = &self.ffmpeg {
            tools.ffmpeg = ffmpeg.clone();
        }
        if let Some(ffprobe) = &self.ffprobe {
            tools.ffprobe = ffprobe.clone();
        }
        if let Some(smartcut) = &self.smartcut {
            tools.smartcut = smartcut.clone();
        }
    }
}

/// Verifies that the external tools a job needs can be started.
pub fn check_tools(tools: &ToolPaths, needs_smartcut: bool) -> CliResult<()> {
    check_dependency(&tools.ffprobe, "-version")
        .context("ffprobe is required; install it or pass --ffprobe")?;
    check_dependency(&tools.ffmpeg, "-version")
        .context("ffmpeg is required; install it or pass --ffmpeg")?;
    if needs_smartcut {
        check_dependency(&tools.smartcut, "--help")
            .context("smartcut is required for smart-cut mode; install it or pass --smartcut")?;
    }
    log::debug!("External dependency check passed.");
    Ok(())
}
