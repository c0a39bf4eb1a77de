//! Extraction pipeline integration tests.
//!
//! These run against `MemorySource`, so no video fixtures are needed.

use std::path::Path;
use std::sync::Mutex;

use image::{Rgb, RgbImage};
use sceneshot::{
    CancellationToken, ExtractionConfig, ExtractionError, FrameDecision, FrameRecord,
    FrameSource, KeyframeExtractor, KeyframeInfo, KeyframeWriter, MemorySource, NoOpProgress,
    PipelineState, ProgressCallback, ProgressInfo, RunStatus, StreamEnd,
};

const PALETTE: [[u8; 3]; 10] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [0, 255, 255],
    [255, 0, 255],
    [255, 128, 0],
    [128, 0, 255],
    [255, 255, 255],
    [128, 128, 128],
];

fn solid(rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(16, 12, Rgb(rgb))
}

fn black() -> RgbImage {
    solid([0, 0, 0])
}

/// `count` frames cycling through distinct solid colours.
fn distinct_frames(count: usize) -> Vec<RgbImage> {
    (0..count).map(|i| solid(PALETTE[i % PALETTE.len()])).collect()
}

fn writer_in(directory: &Path) -> KeyframeWriter {
    KeyframeWriter::create(directory, "clip", 90).expect("Failed to create writer")
}

fn written_files(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(directory)
        .expect("Failed to read output dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Feed every frame of `source` through the step API, returning decisions.
fn decisions(
    extractor: &KeyframeExtractor,
    source: &mut MemorySource,
    writer: &KeyframeWriter,
) -> Vec<FrameDecision> {
    let metadata = source.metadata().clone();
    let mut run = extractor.begin(&metadata, writer);
    let mut out = Vec::new();
    while let Some(frame) = source.next_frame() {
        out.push(run.process(frame).expect("Frame processing failed"));
    }
    out
}

#[derive(Default)]
struct RecordingProgress {
    progress: Mutex<Vec<ProgressInfo>>,
    keyframes: Mutex<Vec<KeyframeInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.progress.lock().unwrap().push(info.clone());
    }

    fn on_keyframe(&self, info: &KeyframeInfo) {
        self.keyframes.lock().unwrap().push(info.clone());
    }
}

// ── Scenario A: distinct solid colours ─────────────────────────────

#[test]
fn ten_frame_clip_is_capped_at_one_keyframe() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(10)).unwrap();

    let outcome = KeyframeExtractor::new(ExtractionConfig::new())
        .run(&mut source, &writer, &NoOpProgress)
        .expect("Extraction failed");

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.stats.max_allowed_keyframes, 1);
    assert_eq!(outcome.stats.keyframes_detected, 1);
    assert_eq!(outcome.stats.frames_processed, 9);
    assert_eq!(outcome.stats.total_frames, 10);
    assert_eq!(written_files(temporary_directory.path()), ["clip_keyframe_0000.jpg"]);
}

#[test]
fn distinct_frames_are_emitted_every_min_gap() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(10))
        .unwrap()
        .with_frame_count(1_800);
    let extractor = KeyframeExtractor::new(ExtractionConfig::new());

    let decisions = decisions(&extractor, &mut source, &writer);

    let emitted: Vec<u64> = decisions
        .iter()
        .filter_map(|decision| match decision {
            FrameDecision::Emitted(info) => Some(info.frame_index),
            _ => None,
        })
        .collect();
    assert_eq!(emitted, [0, 3, 6, 9]);

    for index in [1, 2, 4, 5, 7, 8] {
        assert_eq!(decisions[index], FrameDecision::TooSoon, "frame {index}");
    }
    assert_eq!(
        written_files(temporary_directory.path()),
        [
            "clip_keyframe_0000.jpg",
            "clip_keyframe_0001_00m00s.jpg",
            "clip_keyframe_0002_00m00s.jpg",
            "clip_keyframe_0003_00m00s.jpg",
        ]
    );
}

#[test]
fn bootstrap_keyframe_has_no_score() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(4))
        .unwrap()
        .with_frame_count(1_800);
    let progress = RecordingProgress::default();

    KeyframeExtractor::new(ExtractionConfig::new())
        .run(&mut source, &writer, &progress)
        .expect("Extraction failed");

    let keyframes = progress.keyframes.lock().unwrap();
    assert_eq!(keyframes.len(), 2);
    assert_eq!(keyframes[0].score, None);
    assert_eq!(keyframes[0].sequence_index, 0);
    assert_eq!(keyframes[1].frame_index, 3);
    assert!(keyframes[1].score.is_some_and(|score| score >= 0.1));
    assert!(keyframes.iter().all(|info| info.path.exists()));
}

// ── Scenario B: black frames ───────────────────────────────────────

#[test]
fn black_frames_are_filtered_and_counted() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let frames = vec![
        solid(PALETTE[0]),
        solid(PALETTE[1]),
        black(),
        black(),
        black(),
        solid(PALETTE[2]),
    ];
    let mut source = MemorySource::new("clip.mp4", 30.0, frames)
        .unwrap()
        .with_frame_count(1_800);
    let extractor = KeyframeExtractor::new(ExtractionConfig::new().with_min_frames_between(0));

    let metadata = source.metadata().clone();
    let mut run = extractor.begin(&metadata, &writer);
    let mut emitted = Vec::new();
    while let Some(frame) = source.next_frame() {
        let index = frame.index;
        let decision = run.process(frame).unwrap();
        if (2..=4).contains(&index) {
            assert_eq!(decision, FrameDecision::Black, "frame {index}");
        }
        if let FrameDecision::Emitted(info) = decision {
            emitted.push(info.frame_index);
        }
    }

    assert_eq!(run.state().black_filtered_count(), 3);
    assert_eq!(emitted, [0, 1, 5]);
    assert_eq!(run.state().keyframes_detected(), 3);
}

#[test]
fn black_first_frame_defers_the_baseline() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let frames = vec![black(), solid(PALETTE[0]), solid(PALETTE[0]), solid(PALETTE[3])];
    let mut source = MemorySource::new("clip.mp4", 30.0, frames)
        .unwrap()
        .with_frame_count(1_800);
    let extractor = KeyframeExtractor::new(ExtractionConfig::new().with_min_frames_between(0));

    let decisions = decisions(&extractor, &mut source, &writer);

    assert_eq!(decisions[0], FrameDecision::Black);
    assert_eq!(decisions[1], FrameDecision::NoBaseline);
    assert!(matches!(decisions[2], FrameDecision::BelowThreshold { score } if score < 1e-9));
    match &decisions[3] {
        FrameDecision::Emitted(info) => {
            // The first emitted keyframe always takes the plain name.
            assert_eq!(info.sequence_index, 0);
            assert_eq!(
                info.path.file_name().and_then(|name| name.to_str()),
                Some("clip_keyframe_0000.jpg")
            );
        }
        other => panic!("Expected emission, got: {other:?}"),
    }
}

#[test]
fn black_first_frame_is_not_counted_as_filtered() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, vec![black(); 3])
        .unwrap()
        .with_frame_count(1_800);

    let outcome = KeyframeExtractor::new(ExtractionConfig::new().with_min_frames_between(0))
        .run(&mut source, &writer, &NoOpProgress)
        .unwrap();

    assert_eq!(outcome.stats.black_filtered, 2);
    assert_eq!(outcome.stats.keyframes_detected, 0);
    assert!(written_files(temporary_directory.path()).is_empty());
}

// ── Scenario C: the keyframe cap ───────────────────────────────────

#[test]
fn cap_stops_emission_for_rest_of_stream() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(40))
        .unwrap()
        .with_frame_count(1_800);
    let config = ExtractionConfig::new()
        .with_max_keyframes_per_minute(5)
        .with_min_frames_between(0);
    let extractor = KeyframeExtractor::new(config);

    let metadata = source.metadata().clone();
    assert_eq!(metadata.duration_minutes(), 1.0);

    let mut run = extractor.begin(&metadata, &writer);
    assert_eq!(run.state().max_allowed_keyframes(), 5);

    let mut decisions = Vec::new();
    while let Some(frame) = source.next_frame() {
        decisions.push(run.process(frame).unwrap());
        assert!(run.state().keyframes_detected() <= run.state().max_allowed_keyframes());
    }

    assert!(decisions[..5].iter().all(FrameDecision::is_emitted));
    assert!(decisions[5..].iter().all(|decision| *decision == FrameDecision::CapReached));
    assert_eq!(written_files(temporary_directory.path()).len(), 5);
}

#[test]
fn cap_keeps_the_baseline() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let metadata = sceneshot::VideoMetadata::new("clip.mp4", 10, 30.0);
    let extractor = KeyframeExtractor::new(ExtractionConfig::new().with_min_frames_between(0));
    let mut run = extractor.begin(&metadata, &writer);

    for (index, rgb) in PALETTE.iter().take(4).enumerate() {
        run.process(FrameRecord::new(index as u64, 30.0, solid(*rgb))).unwrap();
    }

    assert_eq!(run.state().keyframes_detected(), 1);
    assert_eq!(run.state().previous_frame().map(|frame| frame.index), Some(0));
}

#[test]
fn zero_allowance_emits_nothing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(10)).unwrap();
    let config = ExtractionConfig::new().with_max_keyframes_per_minute(1);

    let outcome = KeyframeExtractor::new(config)
        .run(&mut source, &writer, &NoOpProgress)
        .unwrap();

    assert_eq!(outcome.stats.max_allowed_keyframes, 0);
    assert_eq!(outcome.stats.keyframes_detected, 0);
    assert!(written_files(temporary_directory.path()).is_empty());
}

// ── State invariants ───────────────────────────────────────────────

#[test]
fn spacing_counter_resets_on_emission_and_counts_otherwise() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let frames: Vec<RgbImage> = (0..30)
        .map(|i| if i % 7 == 3 { black() } else { solid(PALETTE[(i / 2) % PALETTE.len()]) })
        .collect();
    let mut source = MemorySource::new("clip.mp4", 30.0, frames)
        .unwrap()
        .with_frame_count(9_000);
    let extractor = KeyframeExtractor::new(ExtractionConfig::new().with_min_frames_between(2));

    let metadata = source.metadata().clone();
    let mut run = extractor.begin(&metadata, &writer);
    let mut previous_since = 0;
    let mut previous_keyframes = 0;
    let mut previous_black = 0;

    while let Some(frame) = source.next_frame() {
        let first = run.pipeline_state() == PipelineState::Init;
        let decision = run.process(frame).unwrap();
        let state = run.state();

        if decision.is_emitted() {
            assert_eq!(state.frames_since_last_keyframe(), 0);
            assert_eq!(state.keyframes_detected(), previous_keyframes + 1);
        } else if !first {
            assert_eq!(state.frames_since_last_keyframe(), previous_since + 1);
            assert_eq!(state.keyframes_detected(), previous_keyframes);
        }
        assert!(state.black_filtered_count() >= previous_black);

        previous_since = state.frames_since_last_keyframe();
        previous_keyframes = state.keyframes_detected();
        previous_black = state.black_filtered_count();
    }

    assert!(previous_keyframes > 1);
    assert!(previous_black > 0);
}

#[test]
fn baseline_advances_on_skipped_frames() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    // Red, then blue twice: the second blue is compared against the first
    // blue (skipped as too soon), not against the red keyframe.
    let frames = vec![solid(PALETTE[0]), solid(PALETTE[2]), solid(PALETTE[2])];
    let mut source = MemorySource::new("clip.mp4", 30.0, frames)
        .unwrap()
        .with_frame_count(1_800);
    let extractor = KeyframeExtractor::new(ExtractionConfig::new().with_min_frames_between(2));

    let decisions = decisions(&extractor, &mut source, &writer);

    assert!(decisions[0].is_emitted());
    assert_eq!(decisions[1], FrameDecision::TooSoon);
    assert!(matches!(decisions[2], FrameDecision::BelowThreshold { .. }));
}

#[test]
fn black_frame_becomes_the_baseline() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let extractor = KeyframeExtractor::new(ExtractionConfig::new().with_min_frames_between(0));
    let metadata = sceneshot::VideoMetadata::new("clip.mp4", 1_800, 30.0);
    let mut run = extractor.begin(&metadata, &writer);

    run.process(FrameRecord::new(0, 30.0, solid(PALETTE[0]))).unwrap();
    assert_eq!(
        run.process(FrameRecord::new(1, 30.0, black())).unwrap(),
        FrameDecision::Black
    );
    assert_eq!(run.state().previous_frame().map(|frame| frame.index), Some(1));
}

#[test]
fn threshold_of_one_only_emits_the_first_frame() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    // Half red, half blue against all red correlates positively.
    let split = RgbImage::from_fn(16, 12, |x, _| {
        if x < 8 { Rgb(PALETTE[0]) } else { Rgb(PALETTE[2]) }
    });
    let mut source = MemorySource::new("clip.mp4", 30.0, vec![solid(PALETTE[0]), split])
        .unwrap()
        .with_frame_count(1_800);
    let config = ExtractionConfig::new()
        .with_min_frames_between(0)
        .with_scene_threshold(1.0);

    let outcome = KeyframeExtractor::new(config)
        .run(&mut source, &writer, &NoOpProgress)
        .unwrap();

    assert_eq!(outcome.stats.keyframes_detected, 1);
}

#[test]
fn filename_timestamps_round_trip() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let fps = 1.0;
    let mut source = MemorySource::new("clip.mp4", fps, distinct_frames(150))
        .unwrap()
        .with_frame_count(36_000);
    let extractor = KeyframeExtractor::new(ExtractionConfig::new().with_min_frames_between(7));

    let emitted: Vec<KeyframeInfo> = decisions(&extractor, &mut source, &writer)
        .into_iter()
        .filter_map(|decision| match decision {
            FrameDecision::Emitted(info) => Some(info),
            _ => None,
        })
        .collect();
    assert!(emitted.len() > 10);

    for info in emitted.iter().skip(1) {
        let name = info.path.file_stem().and_then(|stem| stem.to_str()).unwrap();
        let stamp = name.rsplit('_').next().unwrap();
        let (minutes, seconds) = stamp.trim_end_matches('s').split_once('m').unwrap();
        let parsed: f64 = minutes.parse::<f64>().unwrap() * 60.0 + seconds.parse::<f64>().unwrap();

        let actual = info.frame_index as f64 / fps;
        assert!(
            (actual - parsed).abs() < 1.0 / fps,
            "{name}: parsed {parsed}s, frame at {actual}s"
        );
    }
}

// ── Progress ───────────────────────────────────────────────────────

#[test]
fn progress_is_reported_at_cadence_and_finishes_at_100() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source =
        MemorySource::new("clip.mp4", 30.0, vec![solid(PALETTE[4]); 100]).unwrap();
    let progress = RecordingProgress::default();

    KeyframeExtractor::new(ExtractionConfig::new())
        .run(&mut source, &writer, &progress)
        .unwrap();

    let reports = progress.progress.lock().unwrap();
    let currents: Vec<u64> = reports.iter().map(|info| info.current).collect();
    assert_eq!(currents, [30, 60, 90, 99]);
    assert_eq!(reports[0].current_frame, Some(30));
    assert!(reports[0].percentage.is_some_and(|pct| (pct - 30.0).abs() < 1e-3));
    assert_eq!(reports.last().unwrap().percentage, Some(100.0));
    assert!(
        reports
            .windows(2)
            .all(|pair| pair[0].percentage <= pair[1].percentage)
    );
}

#[test]
fn progress_interval_is_configurable() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, vec![solid(PALETTE[4]); 11]).unwrap();
    let progress = RecordingProgress::default();

    KeyframeExtractor::new(ExtractionConfig::new().with_progress_interval(5))
        .run(&mut source, &writer, &progress)
        .unwrap();

    assert_eq!(progress.progress.lock().unwrap().len(), 3);
}

// ── Termination ────────────────────────────────────────────────────

#[test]
fn read_failure_completes_by_default() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(5))
        .unwrap()
        .with_frame_count(300)
        .ending_with_failure("corrupt packet");

    let outcome = KeyframeExtractor::new(ExtractionConfig::new())
        .run(&mut source, &writer, &NoOpProgress)
        .unwrap();

    assert!(outcome.is_completed());
    assert!(outcome.is_incomplete());
    assert_eq!(
        outcome.stream_end,
        Some(StreamEnd::ReadFailure("corrupt packet".to_string()))
    );
}

#[test]
fn read_failure_is_fatal_when_requested() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(5))
        .unwrap()
        .with_frame_count(300)
        .ending_with_failure("corrupt packet");

    let result = KeyframeExtractor::new(ExtractionConfig::new().with_fail_on_incomplete_stream(true))
        .run(&mut source, &writer, &NoOpProgress);

    match result {
        Err(ExtractionError::IncompleteStream {
            frames_decoded,
            expected_frames,
            reason,
        }) => {
            assert_eq!(frames_decoded, 5);
            assert_eq!(expected_frames, 300);
            assert_eq!(reason, "corrupt packet");
        }
        other => panic!("Expected IncompleteStream, got: {other:?}"),
    }
}

#[test]
fn clean_end_is_reported_as_end_of_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(3)).unwrap();

    let outcome = KeyframeExtractor::new(ExtractionConfig::new().with_fail_on_incomplete_stream(true))
        .run(&mut source, &writer, &NoOpProgress)
        .unwrap();

    assert_eq!(outcome.stream_end, Some(StreamEnd::EndOfFile));
    assert!(!outcome.is_incomplete());
}

#[test]
fn empty_source_completes_with_zero_stats() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, Vec::new()).unwrap();

    let outcome = KeyframeExtractor::new(ExtractionConfig::new())
        .run(&mut source, &writer, &NoOpProgress)
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.stats.keyframes_detected, 0);
    assert_eq!(outcome.stats.keyframes_per_minute(), 0.0);
}

#[test]
fn write_failure_fails_the_run() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("out");
    let writer = writer_in(&output);
    std::fs::remove_dir(&output).expect("Failed to remove output dir");

    let extractor = KeyframeExtractor::new(ExtractionConfig::new());
    let metadata = sceneshot::VideoMetadata::new("clip.mp4", 1_800, 30.0);
    let mut run = extractor.begin(&metadata, &writer);

    let error = run
        .process(FrameRecord::new(0, 30.0, solid(PALETTE[0])))
        .unwrap_err();
    assert!(error.is_write_error());
    assert_eq!(run.pipeline_state(), PipelineState::Failed);
    assert_eq!(run.state().keyframes_detected(), 0);
    assert!(run.process(FrameRecord::new(1, 30.0, solid(PALETTE[1]))).is_err());
}

#[test]
fn invalid_config_is_rejected_before_any_output() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(3)).unwrap();

    let result = KeyframeExtractor::new(ExtractionConfig::new().with_black_ratio(1.5))
        .run(&mut source, &writer, &NoOpProgress);

    assert!(matches!(result, Err(ExtractionError::InvalidConfig(_))));
    assert_eq!(source.remaining(), 3);
}

// ── Cancellation ───────────────────────────────────────────────────

#[test]
fn pre_cancelled_run_processes_nothing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(10)).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let outcome = KeyframeExtractor::new(ExtractionConfig::new())
        .with_cancellation(token)
        .run(&mut source, &writer, &NoOpProgress)
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(outcome.stats.keyframes_detected, 0);
    assert_eq!(source.remaining(), 10);
    assert!(written_files(temporary_directory.path()).is_empty());
}

struct CancelOnKeyframe {
    token: CancellationToken,
}

impl ProgressCallback for CancelOnKeyframe {
    fn on_progress(&self, _info: &ProgressInfo) {}

    fn on_keyframe(&self, _info: &KeyframeInfo) {
        self.token.cancel();
    }
}

#[test]
fn cancellation_stops_at_next_frame_boundary() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(20))
        .unwrap()
        .with_frame_count(1_800);
    let token = CancellationToken::new();
    let callback = CancelOnKeyframe {
        token: token.clone(),
    };

    let outcome = KeyframeExtractor::new(ExtractionConfig::new())
        .with_cancellation(token)
        .run(&mut source, &writer, &callback)
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(outcome.stats.keyframes_detected, 1);
    assert_eq!(outcome.stats.frames_processed, 0);
    assert_eq!(source.remaining(), 19);
    // Files written before cancellation are kept.
    assert_eq!(written_files(temporary_directory.path()), ["clip_keyframe_0000.jpg"]);
}

// ── Statistics ─────────────────────────────────────────────────────

#[test]
fn stats_report_is_human_readable() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path());
    let mut source = MemorySource::new("clip.mp4", 30.0, distinct_frames(10))
        .unwrap()
        .with_frame_count(1_800);

    let outcome = KeyframeExtractor::new(ExtractionConfig::new())
        .run(&mut source, &writer, &NoOpProgress)
        .unwrap();

    assert_eq!(outcome.stats.keyframes_per_minute(), 4.0);
    let report = outcome.stats.to_string();
    assert!(report.contains("Total frames:        1800"), "{report}");
    assert!(report.contains("Keyframes:           4 (max 180)"), "{report}");
    assert_eq!(outcome.output_dir, temporary_directory.path());
}
