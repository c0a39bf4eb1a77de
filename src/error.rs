//! Error types for the `sceneshot` crate.
//!
//! This module defines [`ExtractionError`], the unified error type returned by
//! every fallible operation in the crate. Variants fall into two fatal
//! classes: *open* errors (the video cannot be read or has unusable
//! metadata) and *write* errors (a keyframe or the output directory cannot
//! be persisted). Reaching the end of the decoded stream is never an error.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `sceneshot` operations.
///
/// Every public method that can fail returns `Result<T, ExtractionError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractionError {
    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoStream::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The stream reports a zero, negative, or unknown frame rate.
    #[error("Video at {path} has an unusable frame rate ({frames_per_second})")]
    InvalidFrameRate {
        /// Path of the offending video.
        path: PathBuf,
        /// The frame rate that was reported.
        frames_per_second: f64,
    },

    /// A video frame could not be decoded or converted.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The keyframe output directory could not be created.
    #[error("Failed to create output directory {path}: {reason}")]
    OutputDirectory {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A selected keyframe could not be encoded or written to disk.
    #[error("Failed to write keyframe {path}: {reason}")]
    KeyframeWrite {
        /// Destination file of the keyframe.
        path: PathBuf,
        /// Underlying reason (disk full, permission denied, ...).
        reason: String,
    },

    /// An [`ExtractionConfig`](crate::ExtractionConfig) field is out of range.
    #[error("Invalid extraction configuration: {0}")]
    InvalidConfig(String),

    /// The stream ended on a read failure and the configuration asked for
    /// that to be treated as fatal.
    #[error(
        "Stream ended early after {frames_decoded} of {expected_frames} frames: {reason}"
    )]
    IncompleteStream {
        /// Frames actually decoded before the failure.
        frames_decoded: u64,
        /// Frame count reported by the container.
        expected_frames: u64,
        /// What the decoder reported.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion or encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The background worker could not be started or died unexpectedly.
    #[error("Extraction worker error: {0}")]
    Worker(String),
}

impl ExtractionError {
    /// Returns `true` for errors raised before any output is produced
    /// because the video cannot be opened or described.
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            ExtractionError::FileOpen { .. }
                | ExtractionError::NoVideoStream
                | ExtractionError::InvalidFrameRate { .. }
        )
    }

    /// Returns `true` for errors raised while persisting keyframes.
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            ExtractionError::OutputDirectory { .. } | ExtractionError::KeyframeWrite { .. }
        )
    }
}

impl From<FfmpegError> for ExtractionError {
    fn from(error: FfmpegError) -> Self {
        ExtractionError::FfmpegError(error.to_string())
    }
}
