//! Black bar detection and crop rectangle selection.
//!
//! A fixed-length window centred on the temporal midpoint of the source is
//! run through ffmpeg's `cropdetect` filter. The most frequent suggestion is
//! used when enough of the suggestions agree with it; otherwise the source
//! is treated as having no reliable bars.

use crate::cancel::CancellationToken;
use crate::config::CROP_SAMPLE_SECONDS;
use crate::error::CropDetectError;
use crate::external::{FfmpegSpawner, run_ffmpeg};
use crate::media::VideoMetadata;
use crate::progress_reporting::ffmpeg_handler::FfmpegProgressHandler;
use crate::utils::format_seek_time;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Share of suggestions that must agree with the chosen rectangle.
pub const CROP_DOMINANCE_RATIO: f64 = 0.8;

/// Pixel difference under which two suggestions count as the same rectangle.
pub const CROP_TOLERANCE_PX: u32 = 4;

/// cropdetect luma limit for SDR sources.
const SDR_LIMIT: u32 = 16;

/// cropdetect luma limit for HDR sources, whose black level sits higher.
const HDR_LIMIT: u32 = 100;

/// Region of the source to keep, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRect {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl CropRect {
    /// Parses `crop=W:H:X:Y` or `W:H:X:Y`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.trim().strip_prefix("crop=").unwrap_or(text.trim());
        let mut parts = body.split(':').map(|p| p.trim().parse::<u32>());
        let rect = Self {
            width: parts.next()?.ok()?,
            height: parts.next()?.ok()?,
            x: parts.next()?.ok()?,
            y: parts.next()?.ok()?,
        };
        if parts.next().is_some() || rect.width == 0 || rect.height == 0 {
            return None;
        }
        Some(rect)
    }

    /// ffmpeg filter expression for this rectangle.
    #[must_use]
    pub fn to_filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    fn is_close_to(&self, other: &CropRect) -> bool {
        self.width.abs_diff(other.width) <= CROP_TOLERANCE_PX
            && self.height.abs_diff(other.height) <= CROP_TOLERANCE_PX
            && self.x.abs_diff(other.x) <= CROP_TOLERANCE_PX
            && self.y.abs_diff(other.y) <= CROP_TOLERANCE_PX
    }

    fn covers_frame(&self, width: u32, height: u32) -> bool {
        self.width >= width && self.height >= height
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Start and length in seconds of the window sampled for a source of `duration`.
pub fn sample_window(duration: f64) -> Result<(f64, f64), CropDetectError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(CropDetectError::UnknownDuration);
    }
    let length = CROP_SAMPLE_SECONDS.min(duration);
    let start = (duration / 2.0 - length / 2.0).max(0.0);
    Ok((start, length))
}

/// Extracts the rectangle from a cropdetect log line.
#[must_use]
pub fn parse_crop_line(line: &str) -> Option<CropRect> {
    let start = line.rfind("crop=")?;
    let token = line[start..].split_whitespace().next()?;
    CropRect::parse(token)
}

/// Picks the crop to apply from the collected suggestions.
///
/// Returns `None` when there are no suggestions, when fewer than
/// [`CROP_DOMINANCE_RATIO`] of them agree with the most frequent one, or when
/// that rectangle covers the whole frame.
#[must_use]
pub fn choose_crop(suggestions: &[CropRect], frame_width: u32, frame_height: u32) -> Option<CropRect> {
    if suggestions.is_empty() {
        return None;
    }

    let mut counts: HashMap<CropRect, usize> = HashMap::new();
    for rect in suggestions {
        *counts.entry(*rect).or_insert(0) += 1;
    }
    // Highest count wins; ties go to the larger area, then to the smaller offsets.
    let (best, _) = counts.into_iter().max_by(|(a, ca), (b, cb)| {
        ca.cmp(cb)
            .then(a.area().cmp(&b.area()))
            .then(b.y.cmp(&a.y))
            .then(b.x.cmp(&a.x))
    })?;

    let agreeing = suggestions.iter().filter(|r| r.is_close_to(&best)).count();
    let ratio = agreeing as f64 / suggestions.len() as f64;
    if ratio < CROP_DOMINANCE_RATIO {
        log::warn!(
            "Inconsistent crop suggestions ({:.0}% agree with {}); not cropping",
            ratio * 100.0,
            best.to_filter()
        );
        return None;
    }

    if frame_width > 0 && frame_height > 0 && best.covers_frame(frame_width, frame_height) {
        log::debug!("No black bars detected");
        return None;
    }
    Some(best)
}

/// Samples the source and returns the crop to apply, if any.
pub fn detect_crop<S: FfmpegSpawner>(
    spawner: &S,
    ffmpeg: &Path,
    metadata: &VideoMetadata,
    cancel: &CancellationToken,
) -> Result<Option<CropRect>, CropDetectError> {
    let (start, length) = sample_window(metadata.duration)?;
    let limit = if metadata.is_hdr() { HDR_LIMIT } else { SDR_LIMIT };
    log::debug!(
        "Sampling {:.1}s at {:.1}s for black bars (limit {})",
        length,
        start,
        limit
    );

    let mut cmd = FfmpegCommand::new_with_path(ffmpeg);
    cmd.arg("-hide_banner");
    cmd.args(["-ss", &format_seek_time(start)]);
    cmd.input(&metadata.path);
    cmd.args([
        "-t",
        &format_seek_time(length),
        "-vf",
        &format!("cropdetect=limit={limit}:round=2:reset=1"),
        "-an",
        "-sn",
        "-f",
        "null",
        "-",
    ]);

    let mut suggestions = Vec::new();
    let mut handler = FfmpegProgressHandler::new(Some(length));
    run_ffmpeg(spawner, cmd, "ffmpeg (cropdetect)", cancel, &mut handler, |event, _| {
        if let FfmpegEvent::Log(_, line) = event {
            if let Some(rect) = parse_crop_line(line) {
                suggestions.push(rect);
            }
        }
    })?;

    let crop = choose_crop(&suggestions, metadata.width, metadata.height);
    match &crop {
        Some(rect) => log::info!("Detected crop: {}", rect.to_filter()),
        None => log::info!("Detected crop: none"),
    }
    Ok(crop)
}
