use super::*;
use crate::config::{TrackSelection, ToolPaths};
use crate::error::{ExtractFailure, MergeError, ProbeError};
use crate::external::mocks::{
    MockFfmpegSpawner, MockFfprobeExecutor, MockSmartCutExecutor, SmartCutOutcome,
    progress_event, sample_metadata, sample_streams,
};
use crate::media::{Stream, StreamKind};
use crate::progress_reporting::JobProgress;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::sync::Mutex;
use tempfile::{TempDir, tempdir};

type MockOrchestrator = JobOrchestrator<MockFfmpegSpawner, MockFfprobeExecutor, MockSmartCutExecutor>;

#[derive(Default)]
struct Recorder(Mutex<Vec<JobProgress>>);

impl ProgressReporter for Recorder {
    fn report(&self, progress: &JobProgress) {
        self.0.lock().unwrap().push(progress.clone());
    }
}

impl Recorder {
    fn updates(&self) -> Vec<JobProgress> {
        self.0.lock().unwrap().clone()
    }
}

fn tools() -> ToolPaths {
    ToolPaths {
        ffmpeg: "ffmpeg".into(),
        ffprobe: "ffprobe".into(),
        smartcut: "smartcut".into(),
    }
}

fn orchestrator(spawner: &MockFfmpegSpawner, smartcut: &MockSmartCutExecutor) -> MockOrchestrator {
    orchestrator_with_probe(
        spawner,
        smartcut,
        MockFfprobeExecutor::with_metadata(sample_metadata(sample_streams())),
    )
}

fn orchestrator_with_probe(
    spawner: &MockFfmpegSpawner,
    smartcut: &MockSmartCutExecutor,
    prober: MockFfprobeExecutor,
) -> MockOrchestrator {
    JobOrchestrator::new(spawner.clone(), prober, smartcut.clone(), tools())
}

fn settings(out: &TempDir) -> ExportSettings {
    let mut settings = ExportSettings::new("/media/source.mkv".into(), out.path().to_path_buf());
    settings.tools = tools();
    settings
}

fn segments(count: u64) -> Vec<Segment> {
    (0..count).map(|i| Segment::new(i * 250, i * 250 + 125)).collect()
}

fn run(orchestrator: &MockOrchestrator, settings: &ExportSettings, segments: &[Segment]) -> JobOutcome {
    orchestrator.run(settings, segments, &Recorder::default(), &CancellationToken::new())
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn copy_job_exports_each_segment() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("source_segment_001.mkv", vec![progress_event("00:00:02.50")], true);
    spawner.add_success_expectation("source_segment_002.mkv", vec![progress_event("00:00:05.00")], true);
    let smartcut = MockSmartCutExecutor::new();

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings(&out), &segments(2));

    let JobOutcome::Done(report) = outcome else {
        panic!("expected Done");
    };
    assert_eq!(
        report.outputs,
        vec![
            out.path().join("source_segment_001.mkv"),
            out.path().join("source_segment_002.mkv")
        ]
    );
    assert!(!report.merged);
    assert!(report.outputs.iter().all(|p| p.is_file()));

    let calls = spawner.get_received_calls();
    assert_eq!(calls.len(), 2);
    let first = calls[0].join(" ");
    assert!(first.contains("-ss 0.000000 -to 5.000000"));
    assert!(first.contains("-c copy"));
    assert!(!first.contains("-vf"));
    assert!(calls[1].join(" ").contains("-ss 10.000000 -to 15.000000"));
}

#[test]
fn progress_is_monotonic_and_completes_only_on_done() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation(
        "source_segment_001.mkv",
        vec![progress_event("00:00:01.00"), progress_event("00:00:04.00")],
        true,
    );
    spawner.add_success_expectation("source_segment_002.mkv", vec![progress_event("00:00:02.00")], true);
    let smartcut = MockSmartCutExecutor::new();
    let recorder = Recorder::default();

    let outcome = orchestrator(&spawner, &smartcut).run(
        &settings(&out),
        &segments(2),
        &recorder,
        &CancellationToken::new(),
    );
    assert_eq!(outcome.exit_code(), 0);

    let updates = recorder.updates();
    assert!(updates.windows(2).all(|w| w[0].overall <= w[1].overall));
    let (last, rest) = updates.split_last().unwrap();
    assert_eq!(last.state, JobState::Done);
    assert_eq!(last.overall, 1.0);
    assert!(rest.iter().all(|p| p.overall < 1.0));
    assert!(updates.iter().any(|p| p.state == JobState::Extracting { index: 2, total: 2 }));
}

#[test]
fn failures_are_aggregated_when_continuing() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("source_segment_001.mkv", vec![], true);
    spawner.add_exit_error_expectation(
        "source_segment_002.mkv",
        vec![FfmpegEvent::Log(LogLevel::Error, "Invalid data found".to_string())],
        1,
    );
    spawner.add_success_expectation("source_segment_003.mkv", vec![], true);
    let smartcut = MockSmartCutExecutor::new();

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings(&out), &segments(3));

    assert_eq!(outcome.exit_code(), 1);
    let JobOutcome::Failed { error, produced } = outcome else {
        panic!("expected Failed");
    };
    let CoreError::SegmentsFailed { failures, total } = &error else {
        panic!("expected SegmentsFailed, got {error:?}");
    };
    assert_eq!(*total, 3);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].segment, 2);
    assert!(error.to_string().contains("Invalid data found"));
    assert_eq!(
        produced,
        vec![
            out.path().join("source_segment_001.mkv"),
            out.path().join("source_segment_003.mkv")
        ]
    );
    assert!(!out.path().join("source_segment_002.mkv").exists());
}

#[test]
fn stop_on_first_error_skips_remaining_segments() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("source_segment_001.mkv", vec![], true);
    spawner.add_exit_error_expectation("source_segment_002.mkv", vec![], 1);
    spawner.add_success_expectation("source_segment_003.mkv", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.error_policy = ErrorPolicy::StopOnFirstError;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(3));

    let JobOutcome::Failed { error, produced } = outcome else {
        panic!("expected Failed");
    };
    assert!(matches!(error, CoreError::Extract(ref e) if e.segment == 2));
    assert_eq!(produced, vec![out.path().join("source_segment_001.mkv")]);
    assert_eq!(spawner.get_received_calls().len(), 2);
}

#[test]
fn cancellation_keeps_finished_clips_and_removes_partial_one() {
    let out = tempdir().unwrap();
    let token = CancellationToken::new();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("source_segment_001.mkv", vec![], true);
    spawner.add_cancel_expectation("source_segment_002.mkv", vec![], token.clone());
    let smartcut = MockSmartCutExecutor::new();
    let recorder = Recorder::default();

    let outcome = orchestrator(&spawner, &smartcut).run(&settings(&out), &segments(3), &recorder, &token);

    assert_eq!(outcome.exit_code(), EXIT_CODE_CANCELLED);
    let JobOutcome::Cancelled { produced } = outcome else {
        panic!("expected Cancelled");
    };
    assert_eq!(produced, vec![out.path().join("source_segment_001.mkv")]);
    assert_eq!(file_names(out.path()), vec!["source_segment_001.mkv"]);
    assert_eq!(spawner.get_received_calls().len(), 2);
    assert_eq!(recorder.updates().last().unwrap().state, JobState::Cancelled);
}

#[test]
fn cancelled_before_start_runs_nothing() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    let token = CancellationToken::new();
    token.cancel();

    let outcome = orchestrator(&spawner, &smartcut).run(&settings(&out), &segments(1), &Recorder::default(), &token);

    assert!(matches!(outcome, JobOutcome::Cancelled { ref produced } if produced.is_empty()));
    assert!(spawner.get_received_calls().is_empty());
}

#[test]
fn cancellation_while_reading_source_metadata_stops_the_job() {
    let out = tempdir().unwrap();
    let token = CancellationToken::new();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    let prober = MockFfprobeExecutor::cancelling(sample_metadata(sample_streams()), token.clone());
    let recorder = Recorder::default();

    let outcome = orchestrator_with_probe(&spawner, &smartcut, prober)
        .run(&settings(&out), &segments(2), &recorder, &token);

    assert_eq!(outcome.exit_code(), EXIT_CODE_CANCELLED);
    assert!(matches!(outcome, JobOutcome::Cancelled { ref produced } if produced.is_empty()));
    assert!(spawner.get_received_calls().is_empty());
    assert_eq!(recorder.updates().last().unwrap().state, JobState::Cancelled);
}

#[test]
fn merge_joins_staged_clips_and_cleans_staging() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("temp_001.mkv", vec![], true);
    spawner.add_success_expectation("temp_002.mkv", vec![], true);
    spawner.add_success_expectation("source_merged.mkv", vec![progress_event("00:00:05.00")], true);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.merge = true;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(2));

    let JobOutcome::Done(report) = outcome else {
        panic!("expected Done");
    };
    assert!(report.merged);
    assert_eq!(report.outputs, vec![out.path().join("source_merged.mkv")]);
    assert_eq!(file_names(out.path()), vec!["source_merged.mkv"]);

    let calls = spawner.get_received_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].join(" ").contains("-f concat -safe 0"));
}

#[test]
fn single_clip_merge_is_moved_without_concat() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("temp_001.mkv", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.merge = true;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(1));

    let JobOutcome::Done(report) = outcome else {
        panic!("expected Done");
    };
    assert!(!report.merged);
    assert_eq!(report.outputs, vec![out.path().join("source_merged.mkv")]);
    assert_eq!(spawner.get_received_calls().len(), 1);
    assert_eq!(file_names(out.path()), vec!["source_merged.mkv"]);
}

#[test]
fn failed_merge_keeps_clips_under_segment_names() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("temp_001.mkv", vec![], true);
    spawner.add_success_expectation("temp_002.mkv", vec![], true);
    spawner.add_exit_error_expectation("source_merged.mkv", vec![], 1);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.merge = true;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(2));

    let JobOutcome::Failed { error, produced } = outcome else {
        panic!("expected Failed");
    };
    assert!(matches!(error, CoreError::Merge(MergeError::Tool(_))));
    assert_eq!(
        produced,
        vec![
            out.path().join("source_segment_001.mkv"),
            out.path().join("source_segment_002.mkv")
        ]
    );
    assert_eq!(
        file_names(out.path()),
        vec!["source_segment_001.mkv", "source_segment_002.mkv"]
    );
}

#[test]
fn segment_failure_in_merge_job_promotes_successful_clips() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("temp_001.mkv", vec![], true);
    spawner.add_exit_error_expectation("temp_002.mkv", vec![], 1);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.merge = true;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(2));

    let JobOutcome::Failed { error, produced } = outcome else {
        panic!("expected Failed");
    };
    assert!(matches!(error, CoreError::SegmentsFailed { total: 2, .. }));
    assert_eq!(produced, vec![out.path().join("source_segment_001.mkv")]);
    assert_eq!(spawner.get_received_calls().len(), 2);
}

#[test]
fn probe_failure_stops_before_any_extraction() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    let prober = MockFfprobeExecutor::with_error(ProbeError::SourceMissing("/media/source.mkv".into()));

    let outcome = run(
        &orchestrator_with_probe(&spawner, &smartcut, prober),
        &settings(&out),
        &segments(2),
    );

    assert!(matches!(
        outcome,
        JobOutcome::Failed { error: CoreError::Probe(ProbeError::SourceMissing(_)), .. }
    ));
    assert!(spawner.get_received_calls().is_empty());
}

#[test]
fn unknown_stream_selection_is_a_mapping_error() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.tracks = TrackSelection::with_streams([0, 9]);

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(1));

    assert!(matches!(
        outcome,
        JobOutcome::Failed { error: CoreError::Mapping(MappingError::UnknownStream(9)), .. }
    ));
    assert!(spawner.get_received_calls().is_empty());
}

#[test]
fn invalid_segments_are_rejected_up_front() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    let orchestrator = orchestrator(&spawner, &smartcut);

    let outcome = run(&orchestrator, &settings(&out), &[Segment::new(0, 10), Segment::new(40, 40)]);
    assert!(matches!(
        outcome,
        JobOutcome::Failed { error: CoreError::InvalidSegment { index: 2, start: 40, end: 40 }, .. }
    ));

    let outcome = run(&orchestrator, &settings(&out), &[]);
    assert!(matches!(outcome, JobOutcome::Failed { error: CoreError::NoSegments, .. }));
}

#[test]
fn selected_audio_is_mapped_with_default_flag() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("source_segment_001.mkv", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.tracks = TrackSelection::with_streams([1, 2]);

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(1));
    assert_eq!(outcome.exit_code(), 0);

    let args = spawner.get_received_calls().remove(0).join(" ");
    assert!(args.contains("-map 0:0 -map 0:1 -map 0:2"));
    assert!(args.contains("-disposition:a:0 0 -disposition:a:1 default"));
    assert!(args.contains("-sn"));
}

#[test]
fn smart_cut_mode_uses_the_smartcut_tool() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.mode = ExportMode::SmartCut;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(2));

    assert_eq!(outcome.exit_code(), 0);
    assert!(spawner.get_received_calls().is_empty());
    let calls = smartcut.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], (out.path().join("source_segment_002.mkv"), 10.0, 15.0));
}

#[test]
fn smart_cut_cancellation_removes_partial_output() {
    let out = tempdir().unwrap();
    let token = CancellationToken::new();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    smartcut.push_outcome(SmartCutOutcome::CancelDuring(token.clone()));
    let mut settings = settings(&out);
    settings.mode = ExportMode::SmartCut;

    let outcome = orchestrator(&spawner, &smartcut).run(&settings, &segments(2), &Recorder::default(), &token);

    assert!(matches!(outcome, JobOutcome::Cancelled { ref produced } if produced.is_empty()));
    assert!(file_names(out.path()).is_empty());
}

#[test]
fn smart_cut_rejects_high_bit_depth_vp9() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    let mut video = Stream::new(0, StreamKind::Video, "vp9");
    video.profile = Some("Profile 2".to_string());
    let prober = MockFfprobeExecutor::with_metadata(sample_metadata(vec![video]));
    let mut settings = settings(&out);
    settings.mode = ExportMode::SmartCut;

    let outcome = run(&orchestrator_with_probe(&spawner, &smartcut, prober), &settings, &segments(1));

    assert!(matches!(outcome, JobOutcome::Failed { error: CoreError::Config(_), .. }));
    assert!(smartcut.calls().is_empty());
}

#[test]
fn reencode_applies_detected_crop() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let crop_line = |_: usize| {
        FfmpegEvent::Log(
            LogLevel::Info,
            "[Parsed_cropdetect_0 @ 0x1] w:1920 h:800 x:0 y:140 crop=1920:800:0:140".to_string(),
        )
    };
    spawner.add_success_expectation("cropdetect", (0..5).map(crop_line).collect(), false);
    spawner.add_success_expectation("source_segment_001.mp4", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.mode = ExportMode::ReEncode;
    settings.crop = true;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(1));

    let JobOutcome::Done(report) = outcome else {
        panic!("expected Done");
    };
    assert_eq!(report.crop.map(|c| c.to_filter()).as_deref(), Some("crop=1920:800:0:140"));
    let args = spawner.get_received_calls().remove(1).join(" ");
    assert!(args.contains("-vf crop=1920:800:0:140"));
    assert!(args.contains("-c:v libx264"));
}

#[test]
fn crop_detection_failure_is_not_fatal() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_exit_error_expectation("cropdetect", vec![], 1);
    spawner.add_success_expectation("source_segment_001.mp4", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.mode = ExportMode::ReEncode;
    settings.crop = true;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(1));

    let JobOutcome::Done(report) = outcome else {
        panic!("expected Done");
    };
    assert_eq!(report.crop, None);
    let args = spawner.get_received_calls().remove(1).join(" ");
    assert!(!args.contains("-vf"));
}

#[test]
fn cropdetect_without_crop_line_exports_uncropped() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let plain_line = FfmpegEvent::Log(LogLevel::Info, "frame=  120 fps=0.0 q=-0.0".to_string());
    spawner.add_success_expectation("cropdetect", vec![plain_line], false);
    spawner.add_success_expectation("source_segment_001.mp4", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.mode = ExportMode::ReEncode;
    settings.crop = true;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(1));

    let JobOutcome::Done(report) = outcome else {
        panic!("expected Done");
    };
    assert_eq!(report.crop, None);
    let calls = spawner.get_received_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].join(" ").contains("cropdetect"));
    assert!(!calls[1].iter().any(|arg| arg == "-vf"));
}

fn streams_with_image_subtitle() -> Vec<Stream> {
    let mut streams = sample_streams();
    streams.push(Stream::new(4, StreamKind::Subtitle, "hdmv_pgs_subtitle").with_language("jpn"));
    streams
}

#[test]
fn reencode_skips_implicit_image_subtitles() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("source_segment_001.mp4", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let prober = MockFfprobeExecutor::with_metadata(sample_metadata(streams_with_image_subtitle()));
    let mut settings = settings(&out);
    settings.mode = ExportMode::ReEncode;

    let outcome = run(&orchestrator_with_probe(&spawner, &smartcut, prober), &settings, &segments(1));

    assert_eq!(outcome.exit_code(), 0);
    let args = spawner.get_received_calls().remove(0).join(" ");
    assert!(args.contains("-map 0:3"));
    assert!(!args.contains("-map 0:4"));
    assert!(args.contains("-c:s mov_text"));
}

#[test]
fn reencode_rejects_explicit_image_subtitle() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    let smartcut = MockSmartCutExecutor::new();
    let prober = MockFfprobeExecutor::with_metadata(sample_metadata(streams_with_image_subtitle()));
    let mut settings = settings(&out);
    settings.mode = ExportMode::ReEncode;
    settings.tracks = TrackSelection::with_streams([1, 4]);

    let outcome = run(&orchestrator_with_probe(&spawner, &smartcut, prober), &settings, &segments(1));

    let JobOutcome::Failed { error: CoreError::Config(message), produced } = outcome else {
        panic!("expected Config error");
    };
    assert!(message.contains("hdmv_pgs_subtitle"));
    assert!(produced.is_empty());
    assert!(spawner.get_received_calls().is_empty());
}

#[test]
fn copy_mode_keeps_image_subtitles() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("source_segment_001.mkv", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let prober = MockFfprobeExecutor::with_metadata(sample_metadata(streams_with_image_subtitle()));
    let mut settings = settings(&out);
    settings.tracks = TrackSelection::with_streams([4]);

    let outcome = run(&orchestrator_with_probe(&spawner, &smartcut, prober), &settings, &segments(1));

    assert_eq!(outcome.exit_code(), 0);
    let args = spawner.get_received_calls().remove(0).join(" ");
    assert!(args.contains("-map 0:4"));
}

#[test]
fn copy_mode_never_runs_crop_detection() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("source_segment_001.mkv", vec![], true);
    let smartcut = MockSmartCutExecutor::new();
    let mut settings = settings(&out);
    settings.crop = true;

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings, &segments(1));

    assert_eq!(outcome.exit_code(), 0);
    let calls = spawner.get_received_calls();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].join(" ").contains("cropdetect"));
}

#[test]
fn empty_clip_counts_as_failed_segment() {
    let out = tempdir().unwrap();
    let spawner = MockFfmpegSpawner::new();
    spawner.add_empty_output_expectation("source_segment_001.mkv");
    let smartcut = MockSmartCutExecutor::new();

    let outcome = run(&orchestrator(&spawner, &smartcut), &settings(&out), &segments(1));

    let JobOutcome::Failed { error: CoreError::SegmentsFailed { failures, .. }, produced } = outcome else {
        panic!("expected SegmentsFailed");
    };
    assert!(matches!(failures[0].kind, ExtractFailure::EmptyOutput(_)));
    assert!(produced.is_empty());
    assert!(file_names(out.path()).is_empty());
}
