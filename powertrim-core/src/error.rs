// ============================================================================
// powertrim-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for the Export Pipeline
//
// Each pipeline stage has its own error type so callers can tell a probe
// failure from a per-segment extraction failure. `CoreError` is the job-level
// error returned by the orchestrator.
//
// KEY COMPONENTS:
// - ToolError / ToolDiagnostic: failures of an external process
// - ProbeError, CropDetectError, MappingError, ExtractError, MergeError
// - CoreError: job-level error, including the aggregate of segment failures

use crate::config::ExportMode;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Lines of captured stderr kept in a diagnostic.
pub const MAX_DIAGNOSTIC_LINES: usize = 200;

/// Exit code and error stream of an external tool run that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDiagnostic {
    pub tool: String,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl fmt::Display for ToolDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{} exited with code {}", self.tool, code)?,
            None => write!(f, "{} was terminated by a signal", self.tool)?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ":\n{stderr}")?;
        }
        Ok(())
    }
}

/// Failure of an external process invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Required tool not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to start {tool}: {source}")]
    Start {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Failed(ToolDiagnostic),

    #[error("{0} was cancelled")]
    Cancelled(String),

    #[error("I/O error while running tool: {0}")]
    Io(#[from] io::Error),
}

impl ToolError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled(_))
    }
}

/// Maps a spawn failure, turning `NotFound` into [`ToolError::NotFound`].
pub fn tool_start_error(tool: &str, path: &std::path::Path, err: io::Error) -> ToolError {
    if err.kind() == io::ErrorKind::NotFound {
        ToolError::NotFound(path.to_path_buf())
    } else {
        ToolError::Start {
            tool: tool.to_string(),
            source: err,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("ffprobe failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Could not parse ffprobe output for {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("No video stream found in {0}")]
    NoVideoStream(PathBuf),
}

/// Never aborts a job; the orchestrator downgrades it to "no crop".
#[derive(Error, Debug)]
pub enum CropDetectError {
    #[error("Crop detection tool failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Cannot sample a source with unknown duration")]
    UnknownDuration,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Selected stream index {0} does not exist in the source")]
    UnknownStream(usize),
}

/// Cause of a single segment extraction failure.
#[derive(Error, Debug)]
pub enum ExtractFailure {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("output file was not created: {0}")]
    MissingOutput(PathBuf),

    #[error("output file is empty: {0}")]
    EmptyOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure of one segment, with the context needed to report it.
#[derive(Error, Debug)]
#[error("Segment {segment} ({mode}) failed: {kind}")]
pub struct ExtractError {
    /// 1-based position of the segment in the job.
    pub segment: usize,
    pub mode: ExportMode,
    #[source]
    pub kind: ExtractFailure,
}

impl ExtractError {
    pub fn new(segment: usize, mode: ExportMode, kind: impl Into<ExtractFailure>) -> Self {
        Self {
            segment,
            mode,
            kind: kind.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&self.kind, ExtractFailure::Tool(e) if e.is_cancelled())
    }
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Nothing to merge: no clips were provided")]
    NoClips,

    #[error("Clip missing from merge input: {0}")]
    MissingClip(PathBuf),

    #[error("Concatenation failed: {0}")]
    Tool(#[from] ToolError),

    #[error("I/O error while merging: {0}")]
    Io(#[from] io::Error),
}

impl MergeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MergeError::Tool(e) if e.is_cancelled())
    }
}

/// Job-level error returned by the orchestrator.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Invalid track selection: {0}")]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("{} of {total} segments failed:\n{}", .failures.len(), format_failures(.failures))]
    SegmentsFailed {
        failures: Vec<ExtractError>,
        total: usize,
    },

    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("No segments to export")]
    NoSegments,

    #[error("Invalid segment {index}: start frame {start} must be before end frame {end}")]
    InvalidSegment { index: usize, start: u64, end: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path error: {0}")]
    Path(String),
}

fn format_failures(failures: &[ExtractError]) -> String {
    failures
        .iter()
        .map(|f| format!("  - {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for powertrim-core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;
