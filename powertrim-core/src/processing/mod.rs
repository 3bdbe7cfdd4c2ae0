//! Segment export pipeline.
//!
//! This module organizes the export steps into submodules and exposes the
//! orchestrator that sequences them for one job.

/// Black bar detection
pub mod crop_detection;

/// Stream maps and default dispositions
pub mod mapping;

/// Output naming templates
pub mod naming;

/// Per-segment extraction strategies
pub mod extract;

/// Lossless clip concatenation
pub mod merge;

/// Job orchestration
pub mod job;

pub use crop_detection::{CropRect, detect_crop};
pub use extract::{ExtractRequest, SegmentExtractor};
pub use job::{EXIT_CODE_CANCELLED, JobOrchestrator, JobOutcome, JobReport, validate_segments};
pub use mapping::{MappingBuilder, MappingPlan, bitmap_subtitles, resolve_selection};
pub use merge::Merger;
pub use naming::{NamingContext, OutputNamer, expand_template};
