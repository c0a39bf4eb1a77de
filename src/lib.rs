//! # sceneshot
//!
//! Extract representative keyframes from a video in a single pass.
//!
//! `sceneshot` decodes a video with FFmpeg (via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)) and keeps the
//! frames where the picture actually changes. Near-duplicates and black
//! frames are dropped, and the total output is capped in proportion to the
//! video's length. Selected frames are written as JPEG files with
//! deterministic, sortable names, and a statistics record summarises the
//! run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sceneshot::{ExtractionConfig, extract_keyframes};
//!
//! let outcome = extract_keyframes("input.mp4", &ExtractionConfig::new())?;
//! println!("{}", outcome.stats);
//! # Ok::<(), sceneshot::ExtractionError>(())
//! ```
//!
//! ### Off the calling thread
//!
//! ```no_run
//! use sceneshot::{ExtractionConfig, ExtractionEvent, spawn_extraction};
//!
//! let handle = spawn_extraction("input.mp4", ExtractionConfig::new())?;
//! while let Some(event) = handle.try_next() {
//!     if let ExtractionEvent::Progress(info) = event {
//!         println!("{:?}", info.percentage);
//!     }
//! }
//! let outcome = handle.wait()?;
//! # Ok::<(), sceneshot::ExtractionError>(())
//! ```
//!
//! ## How frames are selected
//!
//! 1. The first frame is kept unless it is black.
//! 2. Once `floor(duration_minutes × max_keyframes_per_minute)` keyframes
//!    exist, nothing more is kept.
//! 3. A frame less than `min_frames_between` frames after the last keyframe
//!    is skipped.
//! 4. A frame whose pixels are mostly darker than `black_threshold` is
//!    skipped and counted.
//! 5. Otherwise the frame is kept when its HSV histogram differs from the
//!    previous frame's by at least `scene_threshold`.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | [`ExtractionStream`] for consuming events from Tokio |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod black;
pub mod config;
mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod limiter;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod scene;
pub mod source;
#[cfg(feature = "async")]
pub mod stream;
pub mod video;
pub mod worker;
pub mod writer;

pub use black::{black_pixel_ratio, is_black, luminance};
pub use config::ExtractionConfig;
pub use error::ExtractionError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use frame::FrameRecord;
pub use limiter::{RateGate, RateLimiter, max_allowed_keyframes};
pub use metadata::VideoMetadata;
pub use pipeline::{
    ExtractionOutcome, ExtractionRun, ExtractionState, ExtractionStats, FrameDecision,
    KeyframeExtractor, PipelineState, RunStatus, extract_keyframes, extract_keyframes_with,
};
pub use progress::{
    CancellationToken, ChannelReporter, ExtractionEvent, KeyframeInfo, NoOpProgress,
    ProgressCallback, ProgressInfo,
};
pub use scene::{HsvHistogram, difference, rgb_to_hsv};
pub use source::{FrameSource, MemorySource, StreamEnd};
#[cfg(feature = "async")]
pub use stream::{ExtractionStream, extraction_stream, extraction_stream_from};
pub use video::VideoStream;
pub use worker::{ExtractionHandle, spawn_extraction, spawn_extraction_from};
pub use writer::{KeyframeWriter, keyframe_file_name, output_dir_for};
