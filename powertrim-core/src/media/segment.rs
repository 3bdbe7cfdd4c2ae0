//! User-defined frame ranges.

use crate::media::FrameRate;
use serde::{Deserialize, Serialize};

/// A frame range to export as one clip. `end_frame` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start_frame: u64,
    pub end_frame: u64,
    #[serde(default)]
    pub name: String,
    /// Presentation-only tag; the pipeline ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Segment {
    #[must_use]
    pub fn new(start_frame: u64, end_frame: u64) -> Self {
        Self {
            start_frame,
            end_frame,
            name: String::new(),
            color: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start_frame < self.end_frame
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame)
    }

    /// Start and end of the range in seconds.
    #[must_use]
    pub fn time_range(&self, rate: FrameRate) -> (f64, f64) {
        (
            rate.frame_to_seconds(self.start_frame),
            rate.frame_to_seconds(self.end_frame),
        )
    }

    #[must_use]
    pub fn duration_secs(&self, rate: FrameRate) -> f64 {
        let (start, end) = self.time_range(rate);
        end - start
    }
}
