//! Lossless concatenation of exported clips.
//!
//! Clips are joined with ffmpeg's concat demuxer and stream copy, so all
//! inputs must share codecs and stream layout. The manifest is a temporary
//! file in the staging directory.

use crate::cancel::CancellationToken;
use crate::error::MergeError;
use crate::external::{FfmpegSpawner, run_ffmpeg};
use crate::progress_reporting::ffmpeg_handler::FfmpegProgressHandler;
use crate::temp_files::create_temp_file;
use ffmpeg_sidecar::command::FfmpegCommand;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One concat manifest line with single quotes escaped for the demuxer.
#[must_use]
pub fn manifest_line(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', "'\\''"))
}

/// Writes the concat manifest for `clips` into `dir`.
pub fn write_manifest(clips: &[PathBuf], dir: &Path) -> Result<NamedTempFile, MergeError> {
    let mut manifest = create_temp_file(dir, "concat", "txt")?;
    for clip in clips {
        let absolute = fs::canonicalize(clip).unwrap_or_else(|_| clip.clone());
        writeln!(manifest, "{}", manifest_line(&absolute))?;
    }
    manifest.flush()?;
    Ok(manifest)
}

/// Joins clips into one output file.
pub struct Merger<'a, S> {
    spawner: &'a S,
    ffmpeg: &'a Path,
}

impl<'a, S: FfmpegSpawner> Merger<'a, S> {
    pub fn new(spawner: &'a S, ffmpeg: &'a Path) -> Self {
        Self { spawner, ffmpeg }
    }

    /// Concatenates `clips` in order into `output`.
    ///
    /// `expected_duration` is the summed clip length used for progress.
    /// On failure or cancellation the partial output is removed; the input
    /// clips are never touched.
    pub fn merge<F>(
        &self,
        clips: &[PathBuf],
        output: &Path,
        manifest_dir: &Path,
        expected_duration: Option<f64>,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<(), MergeError>
    where
        F: FnMut(f64),
    {
        if clips.is_empty() {
            return Err(MergeError::NoClips);
        }
        if let Some(missing) = clips.iter().find(|c| !c.is_file()) {
            return Err(MergeError::MissingClip(missing.clone()));
        }

        log::info!("Merging {} clips into {}", clips.len(), output.display());
        let manifest = write_manifest(clips, manifest_dir)?;

        let mut cmd = FfmpegCommand::new_with_path(self.ffmpeg);
        cmd.arg("-hide_banner");
        cmd.arg("-y");
        cmd.args(["-f", "concat", "-safe", "0"]);
        cmd.input(manifest.path());
        cmd.args(["-map", "0", "-c", "copy"]);
        cmd.output(output);

        let mut handler = FfmpegProgressHandler::new(expected_duration);
        let result = run_ffmpeg(self.spawner, cmd, "ffmpeg (concat)", cancel, &mut handler, |_, fraction| {
            if let Some(fraction) = fraction {
                on_progress(fraction);
            }
        });

        if let Err(e) = result {
            if let Err(remove_err) = fs::remove_file(output) {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not remove partial merge output {}: {}", output.display(), remove_err);
                }
            }
            return Err(e.into());
        }

        if !output.is_file() {
            return Err(MergeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("merged output {} was not created", output.display()),
            )));
        }
        log::info!("Merged output written to {}", output.display());
        Ok(())
    }
}
