//! Single-segment extraction.
//!
//! Copy, re-encode and ffv1 run through ffmpeg with input seeking; smart-cut
//! hands the range to the smartcut tool. Whatever the strategy, a clip only
//! counts as produced when the output file exists and is non-empty. Failed
//! or cancelled attempts leave no partial file behind.

use crate::cancel::CancellationToken;
use crate::config::ExportMode;
use crate::error::{ExtractError, ExtractFailure};
use crate::external::{FfmpegSpawner, SmartCutExecutor, run_ffmpeg};
use crate::media::{FrameRate, Segment};
use crate::processing::crop_detection::CropRect;
use crate::processing::mapping::MappingPlan;
use crate::progress_reporting::ffmpeg_handler::FfmpegProgressHandler;
use crate::utils::{format_seek_time, format_timestamp};
use ffmpeg_sidecar::command::FfmpegCommand;
use std::fs;
use std::path::Path;

/// Everything needed to extract one segment.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    pub source: &'a Path,
    pub segment: &'a Segment,
    /// 1-based position of the segment in the job.
    pub index: usize,
    pub frame_rate: FrameRate,
    pub mapping: &'a MappingPlan,
    pub crop: Option<&'a CropRect>,
    pub output: &'a Path,
}

/// Builds the ffmpeg command for the ffmpeg-backed modes.
///
/// Layout: `-y -ss START -to END -i SOURCE [-vf crop] MAPS CODECS OUTPUT`.
#[must_use]
pub fn build_ffmpeg_command(ffmpeg: &Path, mode: ExportMode, request: &ExtractRequest<'_>) -> FfmpegCommand {
    let (start, end) = request.segment.time_range(request.frame_rate);

    let mut cmd = FfmpegCommand::new_with_path(ffmpeg);
    cmd.arg("-hide_banner");
    cmd.arg("-y");
    cmd.args(["-ss", &format_seek_time(start), "-to", &format_seek_time(end)]);
    cmd.input(request.source);

    if mode.honors_crop() {
        if let Some(crop) = request.crop {
            cmd.args(["-vf", &crop.to_filter()]);
        }
    }
    cmd.args(request.mapping.to_ffmpeg_args());
    cmd.args(mode.codec_args());
    cmd.output(request.output);
    cmd
}

/// Runs one segment extraction with the configured strategy.
pub struct SegmentExtractor<'a, S, C> {
    spawner: &'a S,
    smartcut: &'a C,
    ffmpeg: &'a Path,
    mode: ExportMode,
}

impl<'a, S: FfmpegSpawner, C: SmartCutExecutor> SegmentExtractor<'a, S, C> {
    pub fn new(spawner: &'a S, smartcut: &'a C, ffmpeg: &'a Path, mode: ExportMode) -> Self {
        Self {
            spawner,
            smartcut,
            ffmpeg,
            mode,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ExportMode {
        self.mode
    }

    /// Extracts one segment to `request.output`.
    ///
    /// `on_progress` receives the fraction of the segment done, when the
    /// strategy reports one.
    pub fn extract<F>(
        &self,
        request: &ExtractRequest<'_>,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<(), ExtractError>
    where
        F: FnMut(f64),
    {
        let (start, end) = request.segment.time_range(request.frame_rate);
        log::info!(
            "Extracting segment {} ({} - {}) with {} to {}",
            request.index,
            format_timestamp(start),
            format_timestamp(end),
            self.mode,
            request.output.display()
        );

        let result = match self.mode {
            ExportMode::SmartCut => self
                .smartcut
                .cut(request.source, request.output, start, end, cancel)
                .map_err(ExtractFailure::from),
            _ => self.run_ffmpeg_mode(request, end - start, cancel, on_progress),
        }
        .and_then(|()| verify_output(request.output));

        if let Err(kind) = result {
            remove_partial_output(request.output);
            let err = ExtractError::new(request.index, self.mode, kind);
            if err.is_cancelled() {
                log::info!("Segment {} cancelled", request.index);
            } else {
                log::error!("{}", err);
            }
            return Err(err);
        }
        log::debug!("Segment {} written to {}", request.index, request.output.display());
        Ok(())
    }

    fn run_ffmpeg_mode<F>(
        &self,
        request: &ExtractRequest<'_>,
        duration: f64,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<(), ExtractFailure>
    where
        F: FnMut(f64),
    {
        let cmd = build_ffmpeg_command(self.ffmpeg, self.mode, request);
        let mut handler = FfmpegProgressHandler::new(Some(duration));
        let tool = format!("ffmpeg ({})", self.mode);
        run_ffmpeg(self.spawner, cmd, &tool, cancel, &mut handler, |_, fraction| {
            if let Some(fraction) = fraction {
                on_progress(fraction);
            }
        })
        .map_err(ExtractFailure::from)
    }
}

/// A produced clip must exist and hold data.
fn verify_output(output: &Path) -> Result<(), ExtractFailure> {
    match fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(ExtractFailure::EmptyOutput(output.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractFailure::MissingOutput(output.to_path_buf()))
        }
        Err(e) => Err(ExtractFailure::Io(e)),
    }
}

fn remove_partial_output(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => log::debug!("Removed partial output {}", output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove partial output {}: {}", output.display(), e),
    }
}
