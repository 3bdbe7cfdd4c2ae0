//! Media description types.
//!
//! This module holds the immutable data the pipeline works on: probed stream
//! metadata, rational frame rates, and the caller's segment list.

pub mod frame_rate;
pub mod info;
pub mod segment;

// Re-export commonly used types
pub use frame_rate::FrameRate;
pub use info::{Stream, StreamKind, VideoMetadata};
pub use segment::Segment;
