//! Decoded frame records.

use std::time::Duration;

use image::RgbImage;

use crate::conversion;

/// A decoded frame together with its position in the stream.
///
/// The pipeline owns each record for one iteration only; the single
/// exception is the comparison baseline, which is moved into the
/// extraction state.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Zero-based index in decode order.
    pub index: u64,
    /// `index / fps`.
    pub timestamp: Duration,
    /// Packed RGB pixels.
    pub image: RgbImage,
}

impl FrameRecord {
    /// Wrap `image` as frame `index` of a stream running at `frames_per_second`.
    pub fn new(index: u64, frames_per_second: f64, image: RgbImage) -> Self {
        Self {
            index,
            timestamp: conversion::frame_timestamp(index, frames_per_second),
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
