//! Core library for exporting frame-range segments from a video with ffmpeg.
//!
//! This crate provides media probing, black bar detection, stream mapping,
//! per-segment extraction in four export modes, lossless merging and the
//! orchestrator that runs a whole export job with progress and cancellation.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use powertrim_core::{
//!     CancellationToken, ExportMode, ExportSettings, JobOrchestrator, NullReporter, Segment,
//! };
//! use std::path::PathBuf;
//!
//! let mut settings = ExportSettings::new(
//!     PathBuf::from("/videos/episode.mkv"),
//!     PathBuf::from("/exports"),
//! );
//! settings.mode = ExportMode::ReEncode;
//! settings.crop = true;
//!
//! let segments = vec![Segment::new(240, 1_680), Segment::new(5_000, 7_400)];
//! let orchestrator = JobOrchestrator::for_tools(&settings.tools);
//! let outcome = orchestrator.run(&settings, &segments, &NullReporter, &CancellationToken::new());
//! std::process::exit(outcome.exit_code());
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod external;
pub mod media;
pub mod processing;
pub mod progress_reporting;
pub mod temp_files;
pub mod utils;
pub mod worker;

// Re-exports for public API
pub use cancel::CancellationToken;
pub use config::{ErrorPolicy, ExportMode, ExportSettings, JobSpec, ToolPaths, TrackSelection};
pub use error::{CoreError, CoreResult};
pub use external::{CommandFfprobeExecutor, FfprobeExecutor, check_dependency, resolve_tool};
pub use media::{FrameRate, Segment, Stream, StreamKind, VideoMetadata};
pub use processing::{
    CropRect, JobOrchestrator, JobOutcome, JobReport, MappingBuilder, MappingPlan,
};
pub use progress_reporting::{
    ChannelReporter, JobProgress, JobState, NullReporter, ProgressReporter,
};
pub use utils::{format_duration, format_timestamp};
pub use worker::{JobHandle, spawn_job, spawn_job_with_token};
