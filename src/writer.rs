//! Keyframe persistence.
//!
//! Keyframes are written as JPEG files into one output directory with
//! deterministic, sortable names:
//!
//! - the first keyframe (sequence index 0): `<stem>_keyframe_0000.jpg`
//! - every later one: `<stem>_keyframe_<NNNN>_<MM>m<SS>s.jpg`, where the
//!   minutes and seconds are the frame's timestamp truncated toward zero.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;

use crate::conversion;
use crate::error::ExtractionError;
use crate::frame::FrameRecord;
use crate::metadata;

/// Default output directory for `video_path`: `<parent>/<stem>_keyframes`.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use sceneshot::output_dir_for;
///
/// assert_eq!(
///     output_dir_for(Path::new("/videos/holiday.mp4")),
///     Path::new("/videos/holiday_keyframes"),
/// );
/// ```
pub fn output_dir_for(video_path: &Path) -> PathBuf {
    let parent = video_path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{}_keyframes", metadata::file_stem(video_path)))
}

/// File name of keyframe `sequence_index` taken at `timestamp`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sceneshot::keyframe_file_name;
///
/// assert_eq!(keyframe_file_name("clip", 0, Duration::ZERO), "clip_keyframe_0000.jpg");
/// assert_eq!(
///     keyframe_file_name("clip", 7, Duration::from_secs_f64(83.9)),
///     "clip_keyframe_0007_01m23s.jpg",
/// );
/// ```
pub fn keyframe_file_name(stem: &str, sequence_index: u64, timestamp: Duration) -> String {
    if sequence_index == 0 {
        format!("{stem}_keyframe_{sequence_index:04}.jpg")
    } else {
        let (minutes, seconds) = conversion::minutes_and_seconds(timestamp);
        format!("{stem}_keyframe_{sequence_index:04}_{minutes:02}m{seconds:02}s.jpg")
    }
}

/// Encodes selected frames as JPEG into an output directory.
#[derive(Debug, Clone)]
pub struct KeyframeWriter {
    output_dir: PathBuf,
    stem: String,
    quality: u8,
}

impl KeyframeWriter {
    /// Prepare `output_dir` (creating it if needed) for keyframes of the
    /// video called `stem`.
    ///
    /// Creation is idempotent: an existing directory is reused as is.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::OutputDirectory`] if the directory cannot
    /// be created.
    pub fn create<P: Into<PathBuf>, S: Into<String>>(
        output_dir: P,
        stem: S,
        quality: u8,
    ) -> Result<Self, ExtractionError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|error| ExtractionError::OutputDirectory {
            path: output_dir.clone(),
            reason: error.to_string(),
        })?;

        log::debug!("Writing keyframes to {}", output_dir.display());

        Ok(Self {
            output_dir,
            stem: stem.into(),
            quality,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Path keyframe `sequence_index` of `frame` would be written to.
    pub fn path_for(&self, frame: &FrameRecord, sequence_index: u64) -> PathBuf {
        self.output_dir
            .join(keyframe_file_name(&self.stem, sequence_index, frame.timestamp))
    }

    /// Encode `frame` and write it as keyframe `sequence_index`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::KeyframeWrite`] if the file cannot be
    /// created, encoded, or flushed.
    pub fn write(&self, frame: &FrameRecord, sequence_index: u64) -> Result<PathBuf, ExtractionError> {
        let path = self.path_for(frame, sequence_index);
        let write_error = |reason: String| ExtractionError::KeyframeWrite {
            path: path.clone(),
            reason,
        };

        let file = File::create(&path).map_err(|error| write_error(error.to_string()))?;
        let mut output = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut output, self.quality.clamp(1, 100));
        frame
            .image
            .write_with_encoder(encoder)
            .map_err(|error| write_error(error.to_string()))?;
        output
            .into_inner()
            .map_err(|error| write_error(error.error().to_string()))?;

        log::debug!(
            "Wrote keyframe {sequence_index} (frame {}) to {}",
            frame.index,
            path.display()
        );

        Ok(path)
    }
}
