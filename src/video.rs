//! FFmpeg-backed frame source.
//!
//! [`VideoStream`] opens a local video file, selects its best video stream,
//! and decodes frames strictly in order, converting each one to packed RGB.
//! It implements [`FrameSource`], so the pipeline never touches FFmpeg
//! directly.
//!
//! # Example
//!
//! ```no_run
//! use sceneshot::{FrameSource, VideoStream};
//!
//! let mut stream = VideoStream::open("input.mp4")?;
//! println!("{} frames @ {:.2} fps",
//!     stream.metadata().frame_count, stream.metadata().frames_per_second);
//!
//! while let Some(frame) = stream.next_frame() {
//!     println!("frame {} at {:?}", frame.index, frame.timestamp);
//! }
//! println!("stopped: {:?}", stream.stream_end());
//! # Ok::<(), sceneshot::ExtractionError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::conversion;
use crate::error::ExtractionError;
use crate::frame::FrameRecord;
use crate::metadata::VideoMetadata;
use crate::source::{FrameSource, StreamEnd};

/// A sequential decoder over the best video stream of a file.
///
/// Opened once per run and closed when dropped. Frames are numbered by
/// decode order starting at 0, so `index / fps` is the frame's nominal
/// timestamp regardless of container PTS gaps.
pub struct VideoStream {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: Option<ScalingContext>,
    video_stream_index: usize,
    metadata: VideoMetadata,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    next_index: u64,
    eof_sent: bool,
    end: Option<StreamEnd>,
}

impl Debug for VideoStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoStream")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("next_index", &self.next_index)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

impl VideoStream {
    /// Open a video file for sequential decoding.
    ///
    /// Initializes FFmpeg (idempotent), opens the container, and prepares a
    /// decoder for the best video stream.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::FileOpen`] if the file is missing or cannot be
    ///   demuxed / decoded.
    /// - [`ExtractionError::NoVideoStream`] if the file has no video.
    /// - [`ExtractionError::InvalidFrameRate`] if the frame rate is zero or
    ///   unknown.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExtractionError> {
        let path = path.as_ref();
        let file_open = |reason: String| ExtractionError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        if !path.exists() {
            return Err(file_open("file does not exist".to_string()));
        }

        log::debug!("Opening video stream: {}", path.display());

        ffmpeg_next::init()
            .map_err(|error| file_open(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| file_open(error.to_string()))?;

        let (video_stream_index, decoder, frames_per_second, stream_frames) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(ExtractionError::NoVideoStream)?;

            let decoder_context = CodecContext::from_parameters(stream.parameters())
                .map_err(|error| {
                    file_open(format!("Failed to read video codec parameters: {error}"))
                })?;
            let decoder = decoder_context
                .decoder()
                .video()
                .map_err(|error| file_open(format!("Failed to create video decoder: {error}")))?;

            let average = stream.avg_frame_rate();
            let mut frames_per_second =
                conversion::rational_to_fps(average.numerator(), average.denominator());
            if frames_per_second <= 0.0 {
                let rate = stream.rate();
                frames_per_second =
                    conversion::rational_to_fps(rate.numerator(), rate.denominator());
            }

            (stream.index(), decoder, frames_per_second, stream.frames())
        };

        if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
            return Err(ExtractionError::InvalidFrameRate {
                path: path.to_path_buf(),
                frames_per_second,
            });
        }

        let frame_count = if stream_frames > 0 {
            stream_frames as u64
        } else {
            let duration_microseconds = input_context.duration();
            if duration_microseconds > 0 {
                (duration_microseconds as f64 / 1_000_000.0 * frames_per_second) as u64
            } else {
                0
            }
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            path: path.to_path_buf(),
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            codec,
        };

        log::debug!(
            "Video stream {video_stream_index}: {}x{} @ {:.3} fps, {} frames [{}]",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            decoder,
            scaler: None,
            video_stream_index,
            metadata,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            next_index: 0,
            eof_sent: false,
            end: None,
        })
    }

    /// Open `path` only long enough to read its metadata.
    ///
    /// # Errors
    ///
    /// Same as [`open`](VideoStream::open).
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<VideoMetadata, ExtractionError> {
        Self::open(path).map(|stream| stream.metadata)
    }

    /// Number of frames decoded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.next_index
    }

    /// Scale the current `decoded_frame` to RGB24.
    ///
    /// The scaler is built lazily from the first decoded frame, and rebuilt
    /// whenever the decoder's output format or size changes.
    fn convert_current_frame(&mut self) -> Result<RgbImage, ExtractionError> {
        let format = self.decoded_frame.format();
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();

        let needs_rebuild = self.scaler.as_ref().is_none_or(|scaler| {
            let input = scaler.input();
            input.format != format || input.width != width || input.height != height
        });
        if needs_rebuild {
            self.scaler = Some(ScalingContext::get(
                format,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::BILINEAR,
            )?);
        }

        let Some(scaler) = self.scaler.as_mut() else {
            return Err(ExtractionError::VideoDecodeError(
                "Scaler unavailable".to_string(),
            ));
        };
        scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;

        conversion::frame_to_rgb_image(&self.rgb_frame, width, height)
    }

    fn finish(&mut self, end: StreamEnd) -> Option<FrameRecord> {
        match &end {
            StreamEnd::EndOfFile => log::debug!(
                "Decoder exhausted after {} frames",
                self.next_index
            ),
            StreamEnd::ReadFailure(reason) => log::warn!(
                "Stream {} stopped after {} frames: {reason}",
                self.metadata.path.display(),
                self.next_index
            ),
        }
        self.end = Some(end);
        None
    }
}

impl FrameSource for VideoStream {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Option<FrameRecord> {
        if self.end.is_some() {
            return None;
        }

        loop {
            // Try to receive a frame the decoder has already produced.
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return match self.convert_current_frame() {
                    Ok(image) => {
                        let record = FrameRecord::new(
                            self.next_index,
                            self.metadata.frames_per_second,
                            image,
                        );
                        self.next_index += 1;
                        Some(record)
                    }
                    Err(error) => self.finish(StreamEnd::ReadFailure(error.to_string())),
                };
            }

            // Decoder has no buffered frames. Feed it more packets.
            if self.eof_sent {
                return self.finish(StreamEnd::EndOfFile);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() != self.video_stream_index {
                        continue;
                    }
                    match self.decoder.send_packet(&packet) {
                        Ok(()) => {}
                        Err(FfmpegError::InvalidData) => {
                            log::debug!("Skipping undecodable packet");
                        }
                        Err(error) => {
                            return self.finish(StreamEnd::ReadFailure(format!(
                                "decoder rejected packet: {error}"
                            )));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return self.finish(StreamEnd::ReadFailure(format!(
                            "failed to flush decoder: {error}"
                        )));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    return self.finish(StreamEnd::ReadFailure(error.to_string()));
                }
            }
        }
    }

    fn stream_end(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }
}
