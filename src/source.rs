//! The frame source contract.
//!
//! A [`FrameSource`] yields a lazy, finite, non-restartable sequence of
//! [`FrameRecord`]s in strict stream order. Running out of frames is the
//! only termination signal the pipeline sees; *why* the sequence ended is
//! recorded separately as a [`StreamEnd`] so that callers who care can tell
//! a clean EOF from a truncated file.
//!
//! [`VideoStream`](crate::VideoStream) is the FFmpeg-backed implementation.
//! [`MemorySource`] serves frames that are already decoded.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use image::RgbImage;

use crate::error::ExtractionError;
use crate::frame::FrameRecord;
use crate::metadata::VideoMetadata;

/// Why a frame sequence stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The decoder was drained after the container reported end of file.
    EndOfFile,
    /// A read or decode failure ended the sequence early.
    ReadFailure(String),
}

impl StreamEnd {
    /// Returns `true` when the stream ended on a failure rather than EOF.
    pub fn is_failure(&self) -> bool {
        matches!(self, StreamEnd::ReadFailure(_))
    }
}

impl Display for StreamEnd {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StreamEnd::EndOfFile => write!(f, "end of file"),
            StreamEnd::ReadFailure(reason) => write!(f, "read failure: {reason}"),
        }
    }
}

/// A sequential producer of decoded frames.
pub trait FrameSource {
    /// Stream metadata, available before the first frame is read.
    fn metadata(&self) -> &VideoMetadata;

    /// Decode and return the next frame, or `None` once exhausted.
    ///
    /// After the first `None` every subsequent call also returns `None`.
    fn next_frame(&mut self) -> Option<FrameRecord>;

    /// How the sequence ended. `None` while frames may still follow.
    fn stream_end(&self) -> Option<&StreamEnd>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn metadata(&self) -> &VideoMetadata {
        (**self).metadata()
    }

    fn next_frame(&mut self) -> Option<FrameRecord> {
        (**self).next_frame()
    }

    fn stream_end(&self) -> Option<&StreamEnd> {
        (**self).stream_end()
    }
}

/// A frame source backed by images held in memory.
///
/// Useful for hosts that decode frames themselves and for exercising the
/// pipeline without a video file.
///
/// # Example
///
/// ```
/// use image::{Rgb, RgbImage};
/// use sceneshot::{FrameSource, MemorySource};
///
/// let frames = vec![RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])); 3];
/// let mut source = MemorySource::new("synthetic.mp4", 30.0, frames)?;
/// assert_eq!(source.metadata().frame_count, 3);
/// assert_eq!(source.next_frame().map(|frame| frame.index), Some(0));
/// # Ok::<(), sceneshot::ExtractionError>(())
/// ```
#[derive(Debug)]
pub struct MemorySource {
    metadata: VideoMetadata,
    frames: VecDeque<RgbImage>,
    next_index: u64,
    failure: Option<String>,
    end: Option<StreamEnd>,
}

impl MemorySource {
    /// Create a source that yields `frames` in order at `frames_per_second`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::InvalidFrameRate`] if `frames_per_second`
    /// is not a positive finite number.
    pub fn new<P: Into<PathBuf>>(
        path: P,
        frames_per_second: f64,
        frames: Vec<RgbImage>,
    ) -> Result<Self, ExtractionError> {
        let path = path.into();
        if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
            return Err(ExtractionError::InvalidFrameRate {
                path,
                frames_per_second,
            });
        }

        let (width, height) = frames
            .first()
            .map(|image| image.dimensions())
            .unwrap_or((0, 0));
        let metadata = VideoMetadata::new(path, frames.len() as u64, frames_per_second)
            .with_dimensions(width, height);

        Ok(Self {
            metadata,
            frames: frames.into(),
            next_index: 0,
            failure: None,
            end: None,
        })
    }

    /// Report `frame_count` in the metadata regardless of how many frames
    /// are actually held.
    #[must_use]
    pub fn with_frame_count(mut self, frame_count: u64) -> Self {
        self.metadata.frame_count = frame_count;
        self
    }

    /// End the sequence with [`StreamEnd::ReadFailure`] instead of EOF.
    #[must_use]
    pub fn ending_with_failure<S: Into<String>>(mut self, reason: S) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Frames not yet yielded.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Option<FrameRecord> {
        if self.end.is_some() {
            return None;
        }

        match self.frames.pop_front() {
            Some(image) => {
                let record =
                    FrameRecord::new(self.next_index, self.metadata.frames_per_second, image);
                self.next_index += 1;
                Some(record)
            }
            None => {
                self.end = Some(match self.failure.take() {
                    Some(reason) => StreamEnd::ReadFailure(reason),
                    None => StreamEnd::EndOfFile,
                });
                None
            }
        }
    }

    fn stream_end(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }
}
