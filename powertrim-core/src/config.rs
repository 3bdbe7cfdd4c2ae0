// ============================================================================
// powertrim-core/src/config.rs
// ============================================================================
//
// CONFIGURATION: Export Settings and Defaults
//
// This module defines the explicit settings value passed into every export
// job, the export modes with their fixed codec parameters, and the defaults
// used when the caller leaves an option unset.
//
// KEY COMPONENTS:
// - ExportMode: copy / smart-cut / re-encode / ffv1
// - ExportSettings: everything one job needs besides the segment list
// - TrackSelection, ErrorPolicy, ToolPaths
// - JobSpec: settings plus segments, loadable from a JSON job file
//
// USAGE:
// Instances of ExportSettings are created by consumers of the library (like
// powertrim-cli) and handed to the JobOrchestrator together with the
// segments. The core never keeps settings in global state.

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::external::resolve_tool;
use crate::media::Segment;

// ---- External crate imports ----
use serde::{Deserialize, Serialize};

// ---- Standard library imports ----
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// DEFAULT CONSTANTS
// ============================================================================

/// Naming template for separately exported clips.
pub const DEFAULT_SEGMENT_TEMPLATE: &str = "{filename}_segment_{num:03d}";

/// Naming template for the merged output.
pub const DEFAULT_MERGED_TEMPLATE: &str = "{filename}_merged";

/// Language priority used when the caller supplies none.
pub const DEFAULT_LANGUAGE_PRIORITY: [&str; 2] = ["eng", "jpn"];

/// x264 quality for re-encode mode.
pub const REENCODE_CRF: u8 = 18;

/// AAC bitrate for re-encode mode.
pub const REENCODE_AUDIO_BITRATE: &str = "192k";

/// Length in seconds of the window sampled by crop detection.
pub const CROP_SAMPLE_SECONDS: f64 = 5.0;

// ============================================================================
// EXPORT MODE
// ============================================================================

/// Execution strategy for extracting one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    /// Stream-level remux, cut at keyframes.
    #[default]
    Copy,
    /// Frame-accurate cut by the external smartcut tool.
    SmartCut,
    /// Full re-encode to H.264/AAC in MP4.
    ReEncode,
    /// Lossless FFV1 video in Matroska, other streams copied.
    Ffv1,
}

impl ExportMode {
    pub const ALL: [ExportMode; 4] = [
        ExportMode::Copy,
        ExportMode::SmartCut,
        ExportMode::ReEncode,
        ExportMode::Ffv1,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExportMode::Copy => "copy",
            ExportMode::SmartCut => "smart-cut",
            ExportMode::ReEncode => "re-encode",
            ExportMode::Ffv1 => "ffv1",
        }
    }

    /// Only re-encode applies a crop filter.
    #[must_use]
    pub fn honors_crop(self) -> bool {
        self == ExportMode::ReEncode
    }

    /// Container extension forced by the mode, if any.
    #[must_use]
    pub fn fixed_extension(self) -> Option<&'static str> {
        match self {
            ExportMode::ReEncode => Some("mp4"),
            ExportMode::Ffv1 => Some("mkv"),
            ExportMode::Copy | ExportMode::SmartCut => None,
        }
    }

    /// ffmpeg codec arguments for the modes executed by ffmpeg.
    #[must_use]
    pub fn codec_args(self) -> Vec<String> {
        let crf = REENCODE_CRF.to_string();
        let args: &[&str] = match self {
            ExportMode::Copy => &["-c", "copy", "-avoid_negative_ts", "make_zero"],
            ExportMode::ReEncode => &[
                "-c:v",
                "libx264",
                "-crf",
                crf.as_str(),
                "-c:a",
                "aac",
                "-b:a",
                REENCODE_AUDIO_BITRATE,
                "-c:s",
                "mov_text",
            ],
            ExportMode::Ffv1 => &[
                "-c:v", "ffv1", "-level", "3", "-g", "1", "-c:a", "copy", "-c:s", "copy",
            ],
            ExportMode::SmartCut => &[],
        };
        args.iter().map(|s| (*s).to_string()).collect()
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "Unknown export mode '{s}' (expected copy, smart-cut, re-encode or ffv1)"
                ))
            })
    }
}

// ============================================================================
// TRACK SELECTION AND POLICIES
// ============================================================================

/// Which source streams to keep and how to rank languages for the default flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSelection {
    /// Selected stream indices. Empty selects every stream.
    pub streams: BTreeSet<usize>,
    /// Ordered language tags; only decides the default disposition.
    pub language_priority: Vec<String>,
}

impl Default for TrackSelection {
    fn default() -> Self {
        Self {
            streams: BTreeSet::new(),
            language_priority: DEFAULT_LANGUAGE_PRIORITY
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl TrackSelection {
    #[must_use]
    pub fn all_streams() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_streams<I: IntoIterator<Item = usize>>(streams: I) -> Self {
        Self {
            streams: streams.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// What the orchestrator does when a segment fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Keep extracting the remaining segments and report all failures.
    #[default]
    Continue,
    /// Abort the job on the first failed segment.
    StopOnFirstError,
}

/// Locations of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub smartcut: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: resolve_tool("ffmpeg"),
            ffprobe: resolve_tool("ffprobe"),
            smartcut: resolve_tool("smartcut"),
        }
    }
}

// ============================================================================
// EXPORT SETTINGS
// ============================================================================

/// Settings for one export job.
///
/// # Examples
///
/// ```rust,no_run
/// use powertrim_core::config::{ExportMode, ExportSettings};
/// use std::path::PathBuf;
///
/// let mut settings = ExportSettings::new(
///     PathBuf::from("/videos/show.mkv"),
///     PathBuf::from("/exports"),
/// );
/// settings.mode = ExportMode::ReEncode;
/// settings.crop = true;
/// settings.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub source: PathBuf,
    #[serde(default)]
    pub mode: ExportMode,
    #[serde(default)]
    pub merge: bool,
    pub output_dir: PathBuf,
    /// Naming template; the mode-specific default is used when unset.
    #[serde(default)]
    pub output_template: Option<String>,
    #[serde(default)]
    pub tracks: TrackSelection,
    /// Detect and remove black bars. Only re-encode honours it.
    #[serde(default)]
    pub crop: bool,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    /// Parent of the merge staging directory; defaults to `output_dir`.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub tools: ToolPaths,
}

impl ExportSettings {
    pub fn new(source: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            source,
            mode: ExportMode::default(),
            merge: false,
            output_dir,
            output_template: None,
            tracks: TrackSelection::default(),
            crop: false,
            error_policy: ErrorPolicy::default(),
            staging_dir: None,
            tools: ToolPaths::default(),
        }
    }

    /// Template used for the job's primary outputs.
    #[must_use]
    pub fn effective_template(&self) -> &str {
        match &self.output_template {
            Some(template) => template,
            None if self.merge => DEFAULT_MERGED_TEMPLATE,
            None => DEFAULT_SEGMENT_TEMPLATE,
        }
    }

    /// Template for separate clips, also used to salvage clips from an abandoned merge.
    #[must_use]
    pub fn segment_template(&self) -> &str {
        if self.merge {
            DEFAULT_SEGMENT_TEMPLATE
        } else {
            self.effective_template()
        }
    }

    /// Whether crop detection should run for this job.
    #[must_use]
    pub fn wants_crop(&self) -> bool {
        self.crop && self.mode.honors_crop()
    }

    #[must_use]
    pub fn staging_parent(&self) -> &Path {
        self.staging_dir.as_deref().unwrap_or(&self.output_dir)
    }

    /// Checks the settings before any external tool runs.
    pub fn validate(&self) -> CoreResult<()> {
        if self.output_dir.is_file() {
            return Err(CoreError::Config(format!(
                "Output directory '{}' is a file",
                self.output_dir.display()
            )));
        }
        if let Some(template) = &self.output_template {
            if template.trim().is_empty() {
                return Err(CoreError::Config(
                    "Output template must not be empty".to_string(),
                ));
            }
        }
        if self
            .tracks
            .language_priority
            .iter()
            .any(|lang| lang.trim().is_empty())
        {
            return Err(CoreError::Config(
                "Language priority entries must not be blank".to_string(),
            ));
        }
        if self.crop && !self.mode.honors_crop() {
            log::debug!(
                "Crop requested with mode {}; it only applies to re-encode and will be ignored",
                self.mode
            );
        }
        Ok(())
    }
}

// ============================================================================
// JOB FILE
// ============================================================================

/// Settings plus segments, the unit accepted from automation callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub settings: ExportSettings,
    pub segments: Vec<Segment>,
}

impl JobSpec {
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Path(format!("Failed to read job file '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }
}
