//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring an extraction,
//! [`CancellationToken`] for cooperative cancellation, and
//! [`ExtractionEvent`], the message type carried from a worker thread back
//! to its host.
//!
//! # Example
//!
//! ```no_run
//! use sceneshot::{
//!     ExtractionConfig, KeyframeExtractor, KeyframeInfo, KeyframeWriter,
//!     ProgressCallback, ProgressInfo, VideoStream, FrameSource,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% ({} keyframes)", info.keyframes_detected);
//!         }
//!     }
//!
//!     fn on_keyframe(&self, info: &KeyframeInfo) {
//!         println!("saved {}", info.path.display());
//!     }
//! }
//!
//! let mut stream = VideoStream::open("input.mp4")?;
//! let writer = KeyframeWriter::create("out", "input", 95)?;
//! let outcome = KeyframeExtractor::new(ExtractionConfig::new())
//!     .run(&mut stream, &writer, &PrintProgress)?;
//! println!("{}", outcome.stats);
//! # Ok::<(), sceneshot::ExtractionError>(())
//! ```

use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::Sender,
};
use std::time::{Duration, Instant};

use crate::error::ExtractionError;
use crate::pipeline::ExtractionStats;
use crate::source::StreamEnd;

/// A snapshot of extraction progress.
///
/// Delivered to [`ProgressCallback::on_progress`] every
/// [`progress_interval`](crate::ExtractionConfig::progress_interval)
/// processed frames, and once more when the run completes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Frames processed so far (the bootstrap frame is not counted).
    pub current: u64,
    /// Total frames reported by the stream, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    ///
    /// Only the final report of a completed run is guaranteed to read 100.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Index of the frame just processed.
    pub current_frame: Option<u64>,
    /// Timestamp of the frame just processed.
    pub current_timestamp: Option<Duration>,
    /// Keyframes emitted so far.
    pub keyframes_detected: u64,
}

/// Details of one saved keyframe.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeInfo {
    /// Zero-based position among emitted keyframes.
    pub sequence_index: u64,
    /// Index of the source frame.
    pub frame_index: u64,
    /// Timestamp of the source frame.
    pub timestamp: Duration,
    /// Scene-difference score that triggered the emission, `None` for the
    /// bootstrap frame.
    pub score: Option<f64>,
    /// Where the keyframe was written.
    pub path: PathBuf,
}

/// Trait for receiving progress updates during extraction.
///
/// Implementations must be [`Send`] and [`Sync`] because the pipeline
/// usually runs on a worker thread.
///
/// Callbacks are **infallible**: they observe but cannot halt the run.
/// Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at the configured cadence and once on completion.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called after each keyframe has been written.
    fn on_keyframe(&self, _info: &KeyframeInfo) {}
}

/// Discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to request
/// cancellation. The pipeline checks
/// [`is_cancelled`](CancellationToken::is_cancelled) once per frame.
///
/// # Example
///
/// ```
/// use sceneshot::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.clone().cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A message from a running extraction to its host.
///
/// Messages arrive in the order they were produced. Every run ends with
/// exactly one terminal message: [`Completed`](ExtractionEvent::Completed),
/// [`Cancelled`](ExtractionEvent::Cancelled) or
/// [`Failed`](ExtractionEvent::Failed).
#[derive(Debug)]
pub enum ExtractionEvent {
    /// Periodic progress.
    Progress(ProgressInfo),
    /// A keyframe was written.
    KeyframeSaved(KeyframeInfo),
    /// The stream was exhausted.
    Completed {
        stats: ExtractionStats,
        output_dir: PathBuf,
        /// How the stream ended. A [`StreamEnd::ReadFailure`] here means the
        /// file may have been truncated.
        stream_end: Option<StreamEnd>,
    },
    /// The run was cancelled; keyframes already written are kept.
    Cancelled {
        stats: ExtractionStats,
        output_dir: PathBuf,
    },
    /// The run stopped on an unrecoverable error.
    Failed(ExtractionError),
}

impl ExtractionEvent {
    /// Returns `true` for the final message of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExtractionEvent::Completed { .. }
                | ExtractionEvent::Cancelled { .. }
                | ExtractionEvent::Failed(_)
        )
    }
}

/// Forwards progress and keyframe notifications into a channel as
/// [`ExtractionEvent`]s.
///
/// Send failures (the receiver was dropped) are ignored; the run itself is
/// unaffected.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: Sender<ExtractionEvent>,
}

impl ChannelReporter {
    pub fn new(sender: Sender<ExtractionEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelReporter {
    fn on_progress(&self, info: &ProgressInfo) {
        let _ = self.sender.send(ExtractionEvent::Progress(info.clone()));
    }

    fn on_keyframe(&self, info: &KeyframeInfo) {
        let _ = self.sender.send(ExtractionEvent::KeyframeSaved(info.clone()));
    }
}

/// Tracks progress timing and fires callbacks at a fixed cadence.
pub(crate) struct ProgressTracker<'a> {
    callback: &'a dyn ProgressCallback,
    total: Option<u64>,
    current: u64,
    interval: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(callback: &'a dyn ProgressCallback, total: Option<u64>, interval: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            interval: interval.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one processed frame and report if the interval is reached.
    pub(crate) fn advance(&mut self, frame_index: u64, timestamp: Duration, keyframes_detected: u64) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.interval {
            self.report(Some(frame_index), Some(timestamp), keyframes_detected, false);
            self.items_since_last_report = 0;
        }
    }

    /// Unconditionally emit the final, 100% report.
    pub(crate) fn finish(&mut self, keyframes_detected: u64) {
        self.report(None, None, keyframes_detected, true);
    }

    pub(crate) fn keyframe(&self, info: &KeyframeInfo) {
        self.callback.on_keyframe(info);
    }

    fn report(
        &self,
        frame_index: Option<u64>,
        timestamp: Option<Duration>,
        keyframes_detected: u64,
        complete: bool,
    ) {
        let elapsed = self.start_time.elapsed();

        let percentage = if complete {
            Some(100.0)
        } else {
            self.total
                .filter(|&total| total > 0)
                .map(|total| ((self.current as f32 / total as f32) * 100.0).min(100.0))
        };

        let estimated_remaining = if complete {
            Some(Duration::ZERO)
        } else if self.current > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.current);
                elapsed.div_f64(self.current as f64).mul_f64(remaining as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_index,
            current_timestamp: timestamp,
            keyframes_detected,
        };

        self.callback.on_progress(&info);
    }
}
