//! The single-pass keyframe extraction pipeline.
//!
//! [`KeyframeExtractor`] drives one run over a [`FrameSource`]: the first
//! usable frame is always kept, and every later frame goes through the rate
//! limiter, the black-frame filter and the scene-difference scorer before
//! it may be written by the [`KeyframeWriter`].
//!
//! The comparison baseline advances on every frame that is not rejected by
//! the global cap, including frames dropped as too soon or black, so that
//! each score measures change against the most recent visual state.
//!
//! For step-by-step control (hosts that decode frames themselves), use
//! [`KeyframeExtractor::begin`] and feed frames to
//! [`ExtractionRun::process`].
//!
//! # Example
//!
//! ```no_run
//! use sceneshot::{ExtractionConfig, extract_keyframes};
//!
//! let config = ExtractionConfig::new().with_scene_threshold(0.25);
//! let outcome = extract_keyframes("lecture.mp4", &config)?;
//! println!("{}", outcome.stats);
//! println!("written to {}", outcome.output_dir.display());
//! # Ok::<(), sceneshot::ExtractionError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use crate::black;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::frame::FrameRecord;
use crate::limiter::{self, RateGate, RateLimiter};
use crate::metadata::VideoMetadata;
use crate::progress::{CancellationToken, KeyframeInfo, NoOpProgress, ProgressCallback, ProgressTracker};
use crate::scene::HsvHistogram;
use crate::source::{FrameSource, StreamEnd};
use crate::video::VideoStream;
use crate::writer::{self, KeyframeWriter};

/// Lifecycle of an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Created, no frame processed yet.
    Init,
    /// At least one frame has been processed.
    Running,
    /// The stream was exhausted.
    Completed,
    /// Stopped by a [`CancellationToken`].
    Cancelled,
    /// Stopped by an unrecoverable error.
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Cancelled | PipelineState::Failed
        )
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDecision {
    /// The frame was written as a keyframe.
    Emitted(KeyframeInfo),
    /// The keyframe cap was already reached. The baseline is unchanged.
    CapReached,
    /// Too few frames since the last keyframe.
    TooSoon,
    /// The frame is black.
    Black,
    /// The frame is too similar to the baseline.
    BelowThreshold {
        /// The scene-difference score against the baseline.
        score: f64,
    },
    /// No baseline exists yet because the first frame was black.
    NoBaseline,
}

impl FrameDecision {
    pub fn is_emitted(&self) -> bool {
        matches!(self, FrameDecision::Emitted(_))
    }
}

/// The comparison baseline, with its histogram computed on demand.
#[derive(Debug, Clone)]
struct Baseline {
    frame: FrameRecord,
    histogram: Option<HsvHistogram>,
}

impl Baseline {
    fn new(frame: FrameRecord, histogram: Option<HsvHistogram>) -> Self {
        Self { frame, histogram }
    }

    fn histogram(&mut self) -> &HsvHistogram {
        let image = &self.frame.image;
        self.histogram
            .get_or_insert_with(|| HsvHistogram::from_image(image))
    }
}

/// Mutable state of one run, owned by its [`ExtractionRun`].
#[derive(Debug, Clone)]
pub struct ExtractionState {
    previous: Option<Baseline>,
    limiter: RateLimiter,
    black_filtered: u64,
    frames_processed: u64,
}

impl ExtractionState {
    fn new(max_allowed_keyframes: u64, min_frames_between: u64) -> Self {
        Self {
            previous: None,
            limiter: RateLimiter::new(max_allowed_keyframes, min_frames_between),
            black_filtered: 0,
            frames_processed: 0,
        }
    }

    /// The current comparison baseline.
    pub fn previous_frame(&self) -> Option<&FrameRecord> {
        self.previous.as_ref().map(|baseline| &baseline.frame)
    }

    pub fn frames_since_last_keyframe(&self) -> u64 {
        self.limiter.frames_since_last()
    }

    pub fn keyframes_detected(&self) -> u64 {
        self.limiter.emitted()
    }

    pub fn black_filtered_count(&self) -> u64 {
        self.black_filtered
    }

    /// Frames processed after the first one.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn max_allowed_keyframes(&self) -> u64 {
        self.limiter.max_allowed()
    }
}

/// Counters describing a finished (or interrupted) run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionStats {
    /// Frame count reported by the stream.
    pub total_frames: u64,
    /// Frames processed after the first one.
    pub frames_processed: u64,
    pub keyframes_detected: u64,
    pub max_allowed_keyframes: u64,
    /// Frames dropped by the black-frame filter.
    pub black_filtered: u64,
    pub duration_minutes: f64,
}

impl ExtractionStats {
    /// Average keyframes per minute of video, `0.0` for an empty video.
    pub fn keyframes_per_minute(&self) -> f64 {
        if self.duration_minutes > 0.0 {
            self.keyframes_detected as f64 / self.duration_minutes
        } else {
            0.0
        }
    }
}

impl Display for ExtractionStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "Total frames:        {}", self.total_frames)?;
        writeln!(f, "Duration:            {:.1} min", self.duration_minutes)?;
        writeln!(
            f,
            "Keyframes:           {} (max {})",
            self.keyframes_detected, self.max_allowed_keyframes
        )?;
        writeln!(f, "Keyframes / minute:  {:.1}", self.keyframes_per_minute())?;
        write!(f, "Black frames:        {}", self.black_filtered)
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub status: RunStatus,
    pub stats: ExtractionStats,
    /// Directory holding the written keyframes.
    pub output_dir: PathBuf,
    /// How the frame source ended. `None` when the run was cancelled
    /// before the source was exhausted.
    pub stream_end: Option<StreamEnd>,
}

impl ExtractionOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Returns `true` when the source stopped on a read failure rather than
    /// a clean end of file.
    pub fn is_incomplete(&self) -> bool {
        self.stream_end.as_ref().is_some_and(StreamEnd::is_failure)
    }
}

/// One extraction run in progress.
///
/// Created by [`KeyframeExtractor::begin`]; frames are fed in stream order
/// through [`process`](ExtractionRun::process).
#[derive(Debug)]
pub struct ExtractionRun<'a> {
    config: &'a ExtractionConfig,
    writer: &'a KeyframeWriter,
    state: ExtractionState,
    pipeline_state: PipelineState,
    total_frames: u64,
    duration_minutes: f64,
}

impl<'a> ExtractionRun<'a> {
    fn new(config: &'a ExtractionConfig, metadata: &VideoMetadata, writer: &'a KeyframeWriter) -> Self {
        let max_allowed = limiter::max_allowed_keyframes(
            metadata.frame_count,
            metadata.frames_per_second,
            config.max_keyframes_per_minute,
        );

        Self {
            config,
            writer,
            state: ExtractionState::new(max_allowed, config.min_frames_between),
            pipeline_state: PipelineState::Init,
            total_frames: metadata.frame_count,
            duration_minutes: metadata.duration_minutes(),
        }
    }

    /// Read-only view of the run's state.
    pub fn state(&self) -> &ExtractionState {
        &self.state
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline_state
    }

    /// Snapshot of the counters so far.
    pub fn stats(&self) -> ExtractionStats {
        ExtractionStats {
            total_frames: self.total_frames,
            frames_processed: self.state.frames_processed,
            keyframes_detected: self.state.keyframes_detected(),
            max_allowed_keyframes: self.state.max_allowed_keyframes(),
            black_filtered: self.state.black_filtered,
            duration_minutes: self.duration_minutes,
        }
    }

    /// Frames handed to [`process`](ExtractionRun::process) so far.
    pub fn frames_seen(&self) -> u64 {
        match self.pipeline_state {
            PipelineState::Init => 0,
            _ => self.state.frames_processed + 1,
        }
    }

    /// Run one iteration of the state machine on the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::KeyframeWrite`] if a selected frame cannot
    /// be written, or [`ExtractionError::InvalidConfig`] if the run has
    /// already ended. A write failure moves the run to
    /// [`PipelineState::Failed`].
    pub fn process(&mut self, frame: FrameRecord) -> Result<FrameDecision, ExtractionError> {
        let result = match self.pipeline_state {
            PipelineState::Init => {
                self.pipeline_state = PipelineState::Running;
                self.bootstrap(frame)
            }
            PipelineState::Running => self.step(frame),
            ended => {
                return Err(ExtractionError::InvalidConfig(format!(
                    "cannot process frames after the run has ended ({ended:?})"
                )));
            }
        };

        if result.is_err() {
            self.pipeline_state = PipelineState::Failed;
        }
        result
    }

    /// Mark the run as completed and return its statistics.
    pub fn complete(&mut self) -> ExtractionStats {
        self.end(PipelineState::Completed)
    }

    /// Mark the run as cancelled and return its partial statistics.
    pub fn cancel(&mut self) -> ExtractionStats {
        self.end(PipelineState::Cancelled)
    }

    fn end(&mut self, state: PipelineState) -> ExtractionStats {
        if !self.pipeline_state.is_terminal() {
            log::debug!("Extraction run {:?} -> {state:?}", self.pipeline_state);
            self.pipeline_state = state;
        }
        self.stats()
    }

    fn fail(&mut self) {
        self.pipeline_state = PipelineState::Failed;
    }

    /// The first frame is kept unless it is black or the cap is zero.
    fn bootstrap(&mut self, frame: FrameRecord) -> Result<FrameDecision, ExtractionError> {
        if self.state.limiter.cap_reached() {
            return Ok(FrameDecision::CapReached);
        }
        if self.is_black(&frame) {
            log::debug!("First frame is black; waiting for a baseline");
            return Ok(FrameDecision::Black);
        }

        let info = self.emit(&frame, None)?;
        self.state.previous = Some(Baseline::new(frame, None));
        Ok(FrameDecision::Emitted(info))
    }

    fn step(&mut self, frame: FrameRecord) -> Result<FrameDecision, ExtractionError> {
        self.state.frames_processed += 1;
        self.state.limiter.tick();

        let mut histogram = None;
        let decision = match self.state.limiter.gate() {
            RateGate::CapReached => return Ok(FrameDecision::CapReached),
            RateGate::TooSoon => FrameDecision::TooSoon,
            RateGate::Open if self.is_black(&frame) => {
                self.state.black_filtered += 1;
                FrameDecision::Black
            }
            RateGate::Open => match self.state.previous.as_mut() {
                None => FrameDecision::NoBaseline,
                Some(baseline) => {
                    let current = HsvHistogram::from_image(&frame.image);
                    let score = baseline.histogram().difference(&current);
                    histogram = Some(current);

                    if score >= self.config.scene_threshold {
                        FrameDecision::Emitted(self.emit(&frame, Some(score))?)
                    } else {
                        FrameDecision::BelowThreshold { score }
                    }
                }
            },
        };

        log::trace!("Frame {}: {decision:?}", frame.index);
        self.state.previous = Some(Baseline::new(frame, histogram));
        Ok(decision)
    }

    fn is_black(&self, frame: &FrameRecord) -> bool {
        black::is_black(&frame.image, self.config.black_threshold, self.config.black_ratio)
    }

    fn emit(&mut self, frame: &FrameRecord, score: Option<f64>) -> Result<KeyframeInfo, ExtractionError> {
        let sequence_index = self.state.keyframes_detected();
        let path = self.writer.write(frame, sequence_index)?;
        self.state.limiter.record_emission();

        log::debug!(
            "Keyframe {sequence_index} at frame {} ({:.2}s, score {score:?})",
            frame.index,
            frame.timestamp.as_secs_f64()
        );

        Ok(KeyframeInfo {
            sequence_index,
            frame_index: frame.index,
            timestamp: frame.timestamp,
            score,
            path,
        })
    }
}

/// Runs keyframe extraction with a fixed configuration.
///
/// # Example
///
/// ```
/// use image::{Rgb, RgbImage};
/// use sceneshot::{
///     ExtractionConfig, KeyframeExtractor, KeyframeWriter, MemorySource, NoOpProgress,
/// };
///
/// let dir = tempfile::tempdir()?;
/// let frames = vec![RgbImage::from_pixel(8, 8, Rgb([200, 40, 40])); 5];
/// let mut source = MemorySource::new("clip.mp4", 30.0, frames)?.with_frame_count(1_800);
/// let writer = KeyframeWriter::create(dir.path(), "clip", 90)?;
///
/// let outcome = KeyframeExtractor::new(ExtractionConfig::new())
///     .run(&mut source, &writer, &NoOpProgress)?;
/// assert_eq!(outcome.stats.keyframes_detected, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct KeyframeExtractor {
    config: ExtractionConfig,
    cancellation: Option<CancellationToken>,
}

impl KeyframeExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Stop the run at the next frame boundary once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Start a run over a stream described by `metadata`.
    ///
    /// The returned run is in [`PipelineState::Init`].
    pub fn begin<'a>(&'a self, metadata: &VideoMetadata, writer: &'a KeyframeWriter) -> ExtractionRun<'a> {
        ExtractionRun::new(&self.config, metadata, writer)
    }

    /// Process every frame of `source`, writing keyframes through `writer`.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::InvalidConfig`] if the configuration is invalid.
    /// - [`ExtractionError::KeyframeWrite`] if a keyframe cannot be written.
    /// - [`ExtractionError::IncompleteStream`] if the source ended on a read
    ///   failure and
    ///   [`fail_on_incomplete_stream`](ExtractionConfig::fail_on_incomplete_stream)
    ///   is set.
    pub fn run<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        writer: &KeyframeWriter,
        progress: &dyn ProgressCallback,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        self.config.validate()?;

        let metadata = source.metadata().clone();
        let mut run = self.begin(&metadata, writer);
        let total = Some(metadata.frame_count).filter(|&count| count > 0);
        let mut tracker = ProgressTracker::new(progress, total, self.config.progress_every());

        log::debug!(
            "Extracting keyframes from {} ({} frames @ {:.3} fps, at most {})",
            metadata.path.display(),
            metadata.frame_count,
            metadata.frames_per_second,
            run.state().max_allowed_keyframes(),
        );

        loop {
            if self.is_cancelled() {
                let stats = run.cancel();
                log::info!(
                    "Extraction cancelled after {} frames ({} keyframes)",
                    run.frames_seen(),
                    stats.keyframes_detected
                );
                return Ok(ExtractionOutcome {
                    status: RunStatus::Cancelled,
                    stats,
                    output_dir: writer.output_dir().to_path_buf(),
                    stream_end: source.stream_end().cloned(),
                });
            }

            let Some(frame) = source.next_frame() else {
                break;
            };

            let bootstrap = run.pipeline_state() == PipelineState::Init;
            let (index, timestamp) = (frame.index, frame.timestamp);

            let decision = run.process(frame)?;
            if let FrameDecision::Emitted(info) = &decision {
                tracker.keyframe(info);
            }
            if !bootstrap {
                tracker.advance(index, timestamp, run.state().keyframes_detected());
            }
        }

        let stream_end = source.stream_end().cloned();
        if let Some(StreamEnd::ReadFailure(reason)) = &stream_end {
            if self.config.fail_on_incomplete_stream {
                run.fail();
                return Err(ExtractionError::IncompleteStream {
                    frames_decoded: run.frames_seen(),
                    expected_frames: metadata.frame_count,
                    reason: reason.clone(),
                });
            }
            log::warn!(
                "Stream ended on a read failure after {} of {} frames; treating as complete",
                run.frames_seen(),
                metadata.frame_count
            );
        }

        let stats = run.complete();
        tracker.finish(stats.keyframes_detected);

        log::info!(
            "Extracted {} keyframes from {} frames ({} black filtered)",
            stats.keyframes_detected,
            run.frames_seen(),
            stats.black_filtered
        );

        Ok(ExtractionOutcome {
            status: RunStatus::Completed,
            stats,
            output_dir: writer.output_dir().to_path_buf(),
            stream_end,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Output directory for `video_path` under `config`.
pub(crate) fn resolve_output_dir(video_path: &Path, config: &ExtractionConfig) -> PathBuf {
    config
        .output_dir
        .clone()
        .unwrap_or_else(|| writer::output_dir_for(video_path))
}

/// Check `path` exists before doing any work.
pub(crate) fn ensure_input_exists(path: &Path) -> Result<(), ExtractionError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ExtractionError::FileOpen {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        })
    }
}

/// Open `path`, extract its keyframes into the configured output
/// directory, and return the outcome. Blocks until done.
///
/// # Errors
///
/// Any open, configuration, or write error. See [`KeyframeExtractor::run`].
pub fn extract_keyframes<P: AsRef<Path>>(
    path: P,
    config: &ExtractionConfig,
) -> Result<ExtractionOutcome, ExtractionError> {
    extract_keyframes_with(path, config, &NoOpProgress, None)
}

/// [`extract_keyframes`] with a progress callback and optional
/// cancellation.
///
/// # Errors
///
/// See [`extract_keyframes`].
pub fn extract_keyframes_with<P: AsRef<Path>>(
    path: P,
    config: &ExtractionConfig,
    progress: &dyn ProgressCallback,
    cancellation: Option<CancellationToken>,
) -> Result<ExtractionOutcome, ExtractionError> {
    let path = path.as_ref();
    ensure_input_exists(path)?;
    config.validate()?;

    let mut stream = VideoStream::open(path)?;
    let writer = KeyframeWriter::create(
        resolve_output_dir(path, config),
        stream.metadata().stem(),
        config.output_quality,
    )?;

    let mut extractor = KeyframeExtractor::new(config.clone());
    if let Some(token) = cancellation {
        extractor = extractor.with_cancellation(token);
    }
    extractor.run(&mut stream, &writer, progress)
}
