//! Extraction configuration.
//!
//! [`ExtractionConfig`] is an immutable-per-run builder holding the
//! selection thresholds (scene threshold, spacing, black-frame cutoffs, rate
//! cap, output quality) together with a few operational settings such as
//! progress cadence and the output directory override.
//!
//! # Example
//!
//! ```
//! use sceneshot::ExtractionConfig;
//!
//! let config = ExtractionConfig::new()
//!     .with_scene_threshold(0.3)
//!     .with_min_frames_between(10)
//!     .with_max_keyframes_per_minute(30);
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;

use crate::error::ExtractionError;

/// Default minimum dissimilarity required to emit a keyframe.
pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.1;
/// Default minimum number of frames between two emitted keyframes.
pub const DEFAULT_MIN_FRAMES_BETWEEN: u64 = 3;
/// Default luminance cutoff below which a pixel counts as black.
pub const DEFAULT_BLACK_THRESHOLD: u8 = 15;
/// Default fraction of black pixels that classifies a frame as black.
pub const DEFAULT_BLACK_RATIO: f64 = 0.90;
/// Default rate cap, in keyframes per minute of video.
pub const DEFAULT_MAX_KEYFRAMES_PER_MINUTE: u32 = 180;
/// Default JPEG quality.
pub const DEFAULT_OUTPUT_QUALITY: u8 = 95;
/// Default progress cadence, in processed frames.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 30;

/// Configuration for one keyframe extraction run.
///
/// Create it once, hand it to [`KeyframeExtractor`](crate::KeyframeExtractor)
/// (or [`extract_keyframes`](crate::extract_keyframes) /
/// [`spawn_extraction`](crate::spawn_extraction)), and never mutate it while
/// the run is in flight. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Minimum scene-difference score, in `[0, 1]`, required to emit a
    /// keyframe. Higher values yield fewer keyframes.
    pub scene_threshold: f64,
    /// Minimum number of frames between two emitted keyframes.
    pub min_frames_between: u64,
    /// Luminance cutoff (0–255). Pixels strictly below it count as black.
    pub black_threshold: u8,
    /// Fraction of black pixels, in `[0, 1]`, at which a frame is black.
    pub black_ratio: f64,
    /// Upper bound on keyframes per minute of video.
    pub max_keyframes_per_minute: u32,
    /// JPEG quality, 0–100.
    pub output_quality: u8,
    /// Progress is reported every this many processed frames.
    pub progress_interval: u64,
    /// Where keyframes are written. `None` uses
    /// `<video_parent>/<video_stem>_keyframes`.
    pub output_dir: Option<PathBuf>,
    /// Treat a stream that ends on a read failure as
    /// [`ExtractionError::IncompleteStream`] instead of a normal completion.
    pub fail_on_incomplete_stream: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create a configuration with the default settings.
    pub fn new() -> Self {
        Self {
            scene_threshold: DEFAULT_SCENE_THRESHOLD,
            min_frames_between: DEFAULT_MIN_FRAMES_BETWEEN,
            black_threshold: DEFAULT_BLACK_THRESHOLD,
            black_ratio: DEFAULT_BLACK_RATIO,
            max_keyframes_per_minute: DEFAULT_MAX_KEYFRAMES_PER_MINUTE,
            output_quality: DEFAULT_OUTPUT_QUALITY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            output_dir: None,
            fail_on_incomplete_stream: false,
        }
    }

    /// Set the minimum scene-difference score for emission.
    #[must_use]
    pub fn with_scene_threshold(mut self, threshold: f64) -> Self {
        self.scene_threshold = threshold;
        self
    }

    /// Set the minimum gap, in frames, between emitted keyframes.
    #[must_use]
    pub fn with_min_frames_between(mut self, frames: u64) -> Self {
        self.min_frames_between = frames;
        self
    }

    /// Set the luminance cutoff used by the black-frame filter.
    #[must_use]
    pub fn with_black_threshold(mut self, threshold: u8) -> Self {
        self.black_threshold = threshold;
        self
    }

    /// Set the fraction of dark pixels that classifies a frame as black.
    #[must_use]
    pub fn with_black_ratio(mut self, ratio: f64) -> Self {
        self.black_ratio = ratio;
        self
    }

    /// Set the per-minute keyframe cap.
    #[must_use]
    pub fn with_max_keyframes_per_minute(mut self, max: u32) -> Self {
        self.max_keyframes_per_minute = max;
        self
    }

    /// Set the JPEG quality of written keyframes.
    #[must_use]
    pub fn with_output_quality(mut self, quality: u8) -> Self {
        self.output_quality = quality;
        self
    }

    /// Set how often progress is reported.
    ///
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames.max(1);
        self
    }

    /// Write keyframes to `dir` instead of the default sibling directory.
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Fail the run when the decoder stops on a read error rather than EOF.
    #[must_use]
    pub fn with_fail_on_incomplete_stream(mut self, strict: bool) -> Self {
        self.fail_on_incomplete_stream = strict;
        self
    }

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if !self.scene_threshold.is_finite() || !(0.0..=1.0).contains(&self.scene_threshold) {
            return Err(ExtractionError::InvalidConfig(format!(
                "scene_threshold must be within [0, 1], got {}",
                self.scene_threshold
            )));
        }
        if !self.black_ratio.is_finite() || !(0.0..=1.0).contains(&self.black_ratio) {
            return Err(ExtractionError::InvalidConfig(format!(
                "black_ratio must be within [0, 1], got {}",
                self.black_ratio
            )));
        }
        if self.max_keyframes_per_minute == 0 {
            return Err(ExtractionError::InvalidConfig(
                "max_keyframes_per_minute must be greater than zero".to_string(),
            ));
        }
        if self.output_quality > 100 {
            return Err(ExtractionError::InvalidConfig(format!(
                "output_quality must be within [0, 100], got {}",
                self.output_quality
            )));
        }
        Ok(())
    }

    /// Progress cadence, never zero.
    pub(crate) fn progress_every(&self) -> u64 {
        self.progress_interval.max(1)
    }
}
