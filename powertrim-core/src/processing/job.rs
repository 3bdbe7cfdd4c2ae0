// ============================================================================
// powertrim-core/src/processing/job.rs
// ============================================================================
//
// EXPORT JOB ORCHESTRATION
//
// Drives one export job from probing to the final outputs:
//
//   validate -> probe -> (crop detection) -> mapping -> extract each segment
//            -> (merge) -> Done | Failed | Cancelled
//
// Segments are extracted sequentially in list order. In merge jobs clips go
// to a private staging directory first; when the merge cannot happen the
// staged clips are promoted into the output directory under the per-clip
// naming template so no finished work is lost.
//
// AI-ASSISTANT-INFO: Export job state machine and segment pipeline

use crate::cancel::CancellationToken;
use crate::config::{ErrorPolicy, ExportMode, ExportSettings, ToolPaths};
use crate::error::{CoreError, CoreResult, ExtractError, MappingError, ProbeError};
use crate::external::{
    CommandFfprobeExecutor, CommandSmartCutExecutor, FfmpegSpawner, FfprobeExecutor,
    SidecarSpawner, SmartCutExecutor,
};
use crate::media::{Segment, Stream, VideoMetadata};
use crate::processing::crop_detection::{CropRect, detect_crop};
use crate::processing::extract::{ExtractRequest, SegmentExtractor};
use crate::processing::mapping::{
    MappingBuilder, MappingPlan, bitmap_subtitles, resolve_selection,
};
use crate::processing::merge::Merger;
use crate::processing::naming::{NamingContext, OutputNamer};
use crate::progress_reporting::{JobState, ProgressReporter, ProgressTracker};
use crate::temp_files::create_staging_dir;
use crate::utils::format_duration;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests;

/// Process exit code for a cancelled job, matching an interrupted shell command.
pub const EXIT_CODE_CANCELLED: i32 = 130;

/// Summary of a successful job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    /// Final output files, in segment order (or the single merged file).
    pub outputs: Vec<PathBuf>,
    /// Whether the outputs were joined by an actual concat run.
    pub merged: bool,
    pub crop: Option<CropRect>,
    pub segments: usize,
    pub elapsed: Duration,
}

/// Terminal result of a job.
#[derive(Debug)]
pub enum JobOutcome {
    Done(JobReport),
    /// `produced` lists clips that were completed and kept before the failure.
    Failed {
        error: CoreError,
        produced: Vec<PathBuf>,
    },
    Cancelled {
        produced: Vec<PathBuf>,
    },
}

impl JobOutcome {
    #[must_use]
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Done(_) => JobState::Done,
            JobOutcome::Failed { .. } => JobState::Failed,
            JobOutcome::Cancelled { .. } => JobState::Cancelled,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            JobOutcome::Done(_) => 0,
            JobOutcome::Failed { .. } => 1,
            JobOutcome::Cancelled { .. } => EXIT_CODE_CANCELLED,
        }
    }

    /// Files present on disk when the job ended.
    #[must_use]
    pub fn produced(&self) -> &[PathBuf] {
        match self {
            JobOutcome::Done(report) => &report.outputs,
            JobOutcome::Failed { produced, .. } | JobOutcome::Cancelled { produced } => produced,
        }
    }
}

/// Why the pipeline stopped early.
enum Interrupt {
    Cancelled,
    Failed(CoreError),
}

impl From<CoreError> for Interrupt {
    fn from(err: CoreError) -> Self {
        Interrupt::Failed(err)
    }
}

impl From<ProbeError> for Interrupt {
    fn from(err: ProbeError) -> Self {
        Interrupt::Failed(err.into())
    }
}

impl From<MappingError> for Interrupt {
    fn from(err: MappingError) -> Self {
        Interrupt::Failed(err.into())
    }
}

impl From<std::io::Error> for Interrupt {
    fn from(err: std::io::Error) -> Self {
        Interrupt::Failed(err.into())
    }
}

/// A clip written to the staging directory of a merge job.
struct StagedClip {
    index: usize,
    path: PathBuf,
}

/// Runs export jobs against a set of tool executors.
pub struct JobOrchestrator<S, P, C> {
    spawner: S,
    prober: P,
    smartcut: C,
    tools: ToolPaths,
}

impl JobOrchestrator<SidecarSpawner, CommandFfprobeExecutor, CommandSmartCutExecutor> {
    /// Orchestrator backed by the real ffmpeg, ffprobe and smartcut binaries.
    #[must_use]
    pub fn for_tools(tools: &ToolPaths) -> Self {
        Self::new(
            SidecarSpawner,
            CommandFfprobeExecutor::new(&tools.ffprobe),
            CommandSmartCutExecutor::new(&tools.smartcut),
            tools.clone(),
        )
    }
}

impl<S, P, C> JobOrchestrator<S, P, C>
where
    S: FfmpegSpawner,
    P: FfprobeExecutor,
    C: SmartCutExecutor,
{
    pub fn new(spawner: S, prober: P, smartcut: C, tools: ToolPaths) -> Self {
        Self {
            spawner,
            prober,
            smartcut,
            tools,
        }
    }

    /// Runs one job to a terminal state.
    ///
    /// Every state change and progress step goes to `reporter`. The job
    /// checks `cancel` between steps, and a running tool is killed as soon as
    /// the token is cancelled.
    pub fn run(
        &self,
        settings: &ExportSettings,
        segments: &[Segment],
        reporter: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let started = Instant::now();
        let merge_planned = settings.merge && segments.len() > 1;
        let mut tracker = ProgressTracker::new(reporter, segments.len(), merge_planned);
        let mut produced = Vec::new();

        log::info!(
            "Starting export of {} segment(s) from {} ({} mode{})",
            segments.len(),
            settings.source.display(),
            settings.mode,
            if settings.merge { ", merged" } else { "" }
        );

        match self.execute(settings, segments, &mut tracker, cancel, &mut produced) {
            Ok(mut report) => {
                report.elapsed = started.elapsed();
                log::info!(
                    "Export finished in {}: {} output(s)",
                    format_duration(report.elapsed.as_secs_f64()),
                    report.outputs.len()
                );
                tracker.enter(JobState::Done);
                JobOutcome::Done(report)
            }
            Err(Interrupt::Cancelled) => {
                log::warn!("Export cancelled; {} clip(s) kept", produced.len());
                tracker.enter(JobState::Cancelled);
                JobOutcome::Cancelled { produced }
            }
            Err(Interrupt::Failed(error)) => {
                log::error!("Export failed: {}", error);
                tracker.enter(JobState::Failed);
                JobOutcome::Failed { error, produced }
            }
        }
    }

    fn execute(
        &self,
        settings: &ExportSettings,
        segments: &[Segment],
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
        produced: &mut Vec<PathBuf>,
    ) -> Result<JobReport, Interrupt> {
        validate_segments(segments)?;
        settings.validate()?;
        check_cancelled(cancel)?;

        tracker.enter(JobState::Probing);
        let metadata = match self.prober.probe(&settings.source, cancel) {
            Ok(metadata) => metadata,
            Err(_) if cancel.is_cancelled() => return Err(Interrupt::Cancelled),
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "Source: {} {} @ {} fps, {} stream(s), {}",
            metadata.container,
            metadata.resolution_label(),
            metadata.frame_rate,
            metadata.streams.len(),
            format_duration(metadata.duration)
        );
        check_cancelled(cancel)?;

        if settings.mode == ExportMode::SmartCut && !metadata.supports_smart_cut() {
            return Err(Interrupt::Failed(CoreError::Config(
                "smart-cut does not support VP9 Profile 2/3 video; use another export mode"
                    .to_string(),
            )));
        }

        let crop = if settings.wants_crop() {
            tracker.enter(JobState::CropDetecting);
            self.crop_for(&metadata, cancel)?
        } else {
            None
        };
        check_cancelled(cancel)?;

        tracker.enter(JobState::Mapping);
        let mut selection = resolve_selection(&metadata.streams, &settings.tracks.streams);
        if settings.mode == ExportMode::ReEncode {
            selection =
                drop_bitmap_subtitles(&metadata.streams, selection, &settings.tracks.streams)?;
        }
        let plan = MappingBuilder::new(&metadata.streams, &settings.tracks.language_priority)
            .build(&selection)?;
        log::debug!("Stream mapping: {}", plan.to_ffmpeg_args().join(" "));

        fs::create_dir_all(&settings.output_dir)?;
        let ctx = NamingContext::new(
            &settings.source,
            metadata.resolution_label(),
            chrono::Local::now(),
        );
        let mut namer = OutputNamer::new(ctx, settings.mode, &settings.source);

        let job = JobContext {
            settings,
            segments,
            metadata: &metadata,
            plan: &plan,
            crop: crop.as_ref(),
        };

        let outputs = if settings.merge {
            self.run_merge_job(&job, &mut namer, tracker, cancel, produced)?
        } else {
            self.run_clip_job(&job, &mut namer, tracker, cancel, produced)?;
            produced.clone()
        };

        Ok(JobReport {
            merged: settings.merge && segments.len() > 1,
            outputs,
            crop,
            segments: segments.len(),
            elapsed: Duration::ZERO,
        })
    }

    /// Crop detection failure is not fatal; the job continues uncropped.
    fn crop_for(
        &self,
        metadata: &VideoMetadata,
        cancel: &CancellationToken,
    ) -> Result<Option<CropRect>, Interrupt> {
        match detect_crop(&self.spawner, &self.tools.ffmpeg, metadata, cancel) {
            Ok(crop) => Ok(crop),
            Err(_) if cancel.is_cancelled() => Err(Interrupt::Cancelled),
            Err(e) => {
                log::warn!("Crop detection failed, continuing without crop: {}", e);
                Ok(None)
            }
        }
    }

    /// Extracts every segment straight into the output directory.
    fn run_clip_job(
        &self,
        job: &JobContext<'_>,
        namer: &mut OutputNamer,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
        produced: &mut Vec<PathBuf>,
    ) -> Result<(), Interrupt> {
        let template = job.settings.effective_template();
        let mut failures = Vec::new();

        for (i, segment) in job.segments.iter().enumerate() {
            let index = i + 1;
            let output = namer.clip_path(&job.settings.output_dir, template, index, segment);
            match self.extract_one(job, index, &output, tracker, cancel)? {
                Ok(()) => produced.push(output),
                Err(e) => {
                    if job.settings.error_policy == ErrorPolicy::StopOnFirstError {
                        return Err(Interrupt::Failed(CoreError::Extract(e)));
                    }
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Interrupt::Failed(CoreError::SegmentsFailed {
                failures,
                total: job.segments.len(),
            }))
        }
    }

    /// Extracts into a staging directory, then merges into one output.
    fn run_merge_job(
        &self,
        job: &JobContext<'_>,
        namer: &mut OutputNamer,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
        produced: &mut Vec<PathBuf>,
    ) -> Result<Vec<PathBuf>, Interrupt> {
        let staging = create_staging_dir(job.settings.staging_parent())?;
        log::debug!("Staging clips in {}", staging.path().display());

        let mut staged: Vec<StagedClip> = Vec::new();
        let mut failures: Vec<ExtractError> = Vec::new();

        for index in 1..=job.segments.len() {
            let output = namer.staging_path(staging.path(), index);
            match self.extract_one(job, index, &output, tracker, cancel)? {
                Ok(()) => staged.push(StagedClip { index, path: output }),
                Err(e) => {
                    let stop = job.settings.error_policy == ErrorPolicy::StopOnFirstError;
                    failures.push(e);
                    if stop {
                        break;
                    }
                }
            }
        }

        if !failures.is_empty() {
            promote_staged(job, namer, &staged, produced);
            let error = if job.settings.error_policy == ErrorPolicy::StopOnFirstError {
                CoreError::Extract(failures.remove(0))
            } else {
                CoreError::SegmentsFailed {
                    failures,
                    total: job.segments.len(),
                }
            };
            return Err(Interrupt::Failed(error));
        }

        let (Some(first), Some(last)) = (job.segments.first(), job.segments.last()) else {
            return Err(Interrupt::Failed(CoreError::NoSegments));
        };
        let final_path = namer.merged_path(
            &job.settings.output_dir,
            job.settings.effective_template(),
            first,
            last,
        );

        if let [only] = staged.as_slice() {
            log::info!("Single clip; skipping merge");
            move_file(&only.path, &final_path)?;
            produced.push(final_path.clone());
            return Ok(vec![final_path]);
        }

        check_cancelled(cancel)?;
        tracker.enter(JobState::Merging);
        let clips: Vec<PathBuf> = staged.iter().map(|c| c.path.clone()).collect();
        let total_duration: f64 = job
            .segments
            .iter()
            .map(|s| s.duration_secs(job.metadata.frame_rate))
            .sum();

        let merger = Merger::new(&self.spawner, &self.tools.ffmpeg);
        match merger.merge(
            &clips,
            &final_path,
            staging.path(),
            Some(total_duration),
            cancel,
            |fraction| tracker.merge_progress(fraction),
        ) {
            Ok(()) => {
                produced.push(final_path.clone());
                Ok(vec![final_path])
            }
            Err(e) if e.is_cancelled() || cancel.is_cancelled() => Err(Interrupt::Cancelled),
            Err(e) => {
                promote_staged(job, namer, &staged, produced);
                Err(Interrupt::Failed(CoreError::Merge(e)))
            }
        }
    }

    /// Extracts one segment. The outer `Err` stops the job; the inner one
    /// is a segment failure the caller decides about.
    fn extract_one(
        &self,
        job: &JobContext<'_>,
        index: usize,
        output: &Path,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> Result<Result<(), ExtractError>, Interrupt> {
        check_cancelled(cancel)?;
        tracker.enter(JobState::Extracting {
            index,
            total: job.segments.len(),
        });

        let extractor = SegmentExtractor::new(
            &self.spawner,
            &self.smartcut,
            &self.tools.ffmpeg,
            job.settings.mode,
        );
        let request = ExtractRequest {
            source: &job.settings.source,
            segment: &job.segments[index - 1],
            index,
            frame_rate: job.metadata.frame_rate,
            mapping: job.plan,
            crop: job.crop,
            output,
        };

        let result = extractor.extract(&request, cancel, |fraction| tracker.segment_progress(fraction));
        match result {
            Err(e) if e.is_cancelled() || cancel.is_cancelled() => Err(Interrupt::Cancelled),
            other => {
                tracker.segment_finished();
                Ok(other)
            }
        }
    }
}

/// Per-job values shared by the extraction loops.
struct JobContext<'a> {
    settings: &'a ExportSettings,
    segments: &'a [Segment],
    metadata: &'a VideoMetadata,
    plan: &'a MappingPlan,
    crop: Option<&'a CropRect>,
}

/// Re-encoding converts subtitles to mov_text, which image-based subtitles
/// cannot become. Implicitly selected ones are skipped; an explicit pick fails
/// the job before any extraction.
fn drop_bitmap_subtitles(
    streams: &[Stream],
    selection: BTreeSet<usize>,
    requested: &BTreeSet<usize>,
) -> Result<BTreeSet<usize>, Interrupt> {
    let bitmap = bitmap_subtitles(streams, &selection);
    if let Some(stream) = bitmap.iter().find(|s| requested.contains(&s.index)) {
        return Err(Interrupt::Failed(CoreError::Config(format!(
            "subtitle stream {} ({}) is image-based and cannot be re-encoded; \
             deselect it or use another export mode",
            stream.index, stream.codec
        ))));
    }
    for stream in &bitmap {
        log::warn!(
            "Skipping image-based subtitle stream {} ({}) in re-encode mode",
            stream.index,
            stream.codec
        );
    }
    let skipped: BTreeSet<usize> = bitmap.iter().map(|s| s.index).collect();
    Ok(selection.difference(&skipped).copied().collect())
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), Interrupt> {
    if cancel.is_cancelled() {
        Err(Interrupt::Cancelled)
    } else {
        Ok(())
    }
}

/// Rejects an empty list and ranges that do not move forward.
pub fn validate_segments(segments: &[Segment]) -> CoreResult<()> {
    if segments.is_empty() {
        return Err(CoreError::NoSegments);
    }
    for (i, segment) in segments.iter().enumerate() {
        if !segment.is_valid() {
            return Err(CoreError::InvalidSegment {
                index: i + 1,
                start: segment.start_frame,
                end: segment.end_frame,
            });
        }
    }
    Ok(())
}

/// Moves staged clips of an abandoned merge into the output directory.
fn promote_staged(
    job: &JobContext<'_>,
    namer: &mut OutputNamer,
    staged: &[StagedClip],
    produced: &mut Vec<PathBuf>,
) {
    let template = job.settings.segment_template();
    for clip in staged {
        let segment = &job.segments[clip.index - 1];
        let dest = namer.clip_path(&job.settings.output_dir, template, clip.index, segment);
        match move_file(&clip.path, &dest) {
            Ok(()) => {
                log::info!("Kept clip for segment {} as {}", clip.index, dest.display());
                produced.push(dest);
            }
            Err(e) => log::warn!(
                "Could not keep clip for segment {} ({}): {}",
                clip.index,
                clip.path.display(),
                e
            ),
        }
    }
}

/// Renames `from` to `to`, copying across filesystems when needed.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
