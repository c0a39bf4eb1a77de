//! Video stream metadata.
//!
//! [`VideoMetadata`] is captured once when a [`FrameSource`](crate::FrameSource)
//! is opened and stays fixed for the lifetime of the run. It carries the
//! attributes the pipeline needs up front: frame count, frame rate, and the
//! derived duration in minutes that drives the keyframe rate cap.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Metadata for the video stream being analysed.
///
/// # Example
///
/// ```
/// use sceneshot::VideoMetadata;
///
/// let metadata = VideoMetadata::new("clip.mp4", 1_800, 30.0);
/// assert_eq!(metadata.duration_minutes(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Path of the source video.
    pub path: PathBuf,
    /// Frame width in pixels (0 when unknown).
    pub width: u32,
    /// Frame height in pixels (0 when unknown).
    pub height: u32,
    /// Frames per second. Always positive for an opened stream.
    pub frames_per_second: f64,
    /// Total number of frames reported by the container.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`), or `"raw"` for in-memory sources.
    pub codec: String,
}

impl VideoMetadata {
    /// Build metadata for a stream of known length and rate.
    pub fn new<P: Into<PathBuf>>(path: P, frame_count: u64, frames_per_second: f64) -> Self {
        Self {
            path: path.into(),
            width: 0,
            height: 0,
            frames_per_second,
            frame_count,
            codec: "raw".to_string(),
        }
    }

    /// Set the frame dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Duration in minutes, `frame_count / fps / 60`.
    pub fn duration_minutes(&self) -> f64 {
        if self.frames_per_second > 0.0 {
            self.frame_count as f64 / self.frames_per_second / 60.0
        } else {
            0.0
        }
    }

    /// Duration as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64((self.duration_minutes() * 60.0).max(0.0))
    }

    /// File stem used to name the output directory and keyframe files.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

/// Lossy file stem of `path`, falling back to `"video"`.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "video".to_string())
}
