//! Internal conversion helpers.
//!
//! Pixel-data copying out of FFmpeg frames and frame-index / timestamp
//! arithmetic shared by the source, pipeline, and writer.

use std::time::Duration;

use ffmpeg_next::frame::Video as VideoFrame;
use image::RgbImage;

use crate::error::ExtractionError;

/// Copy an RGB24 FFmpeg frame into a tightly-packed [`RgbImage`].
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3),
/// which is stripped here.
pub(crate) fn frame_to_rgb_image(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<RgbImage, ExtractionError> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    let buffer = if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    };

    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        ExtractionError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })
}

/// Timestamp of frame `index` in a stream running at `frames_per_second`.
pub(crate) fn frame_timestamp(index: u64, frames_per_second: f64) -> Duration {
    if frames_per_second > 0.0 {
        Duration::from_secs_f64(index as f64 / frames_per_second)
    } else {
        Duration::ZERO
    }
}

/// Split a timestamp into whole minutes and the remaining whole seconds,
/// truncating toward zero.
pub(crate) fn minutes_and_seconds(timestamp: Duration) -> (u64, u64) {
    let seconds = timestamp.as_secs();
    (seconds / 60, seconds % 60)
}

/// Frames per second from a rational frame rate, `0.0` when undefined.
pub(crate) fn rational_to_fps(numerator: i32, denominator: i32) -> f64 {
    if denominator != 0 && numerator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}
