//! Scene-difference scoring.
//!
//! Two frames are compared through their joint hue/saturation/value
//! histograms: each frame is converted to 8-bit HSV, binned into a
//! 50×60×60 histogram, normalised to unit mass, and the two histograms are
//! compared with the correlation coefficient. The score is
//! `1 - max(0, correlation)`: `0.0` for frames with identical colour
//! distributions, approaching `1.0` for unrelated ones.
//!
//! The metric is deliberately global. It tolerates camera shake and small
//! motion, but cannot see identically-coloured content being rearranged.
//!
//! # Example
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use sceneshot::difference;
//!
//! let red = RgbImage::from_pixel(8, 8, Rgb([220, 20, 20]));
//! let blue = RgbImage::from_pixel(8, 8, Rgb([20, 20, 220]));
//!
//! assert!(difference(&red, &red) < 1e-9);
//! assert!(difference(&red, &blue) > 0.9);
//! ```

use std::sync::OnceLock;

use image::RgbImage;

/// Number of hue bins.
pub const HUE_BINS: usize = 50;
/// Number of saturation bins.
pub const SATURATION_BINS: usize = 60;
/// Number of value bins.
pub const VALUE_BINS: usize = 60;

/// Exclusive upper bound of the 8-bit hue range (degrees halved).
pub const HUE_RANGE: usize = 180;
/// Exclusive upper bound of the saturation and value ranges.
pub const CHANNEL_RANGE: usize = 256;

const TOTAL_BINS: usize = HUE_BINS * SATURATION_BINS * VALUE_BINS;

const HSV_SHIFT: i32 = 12;
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

/// Reciprocal tables for the fixed-point HSV conversion.
struct DivisionTables {
    saturation: [i32; 256],
    hue: [i32; 256],
}

fn division_tables() -> &'static DivisionTables {
    static TABLES: OnceLock<DivisionTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut saturation = [0_i32; 256];
        let mut hue = [0_i32; 256];
        for i in 1..256 {
            saturation[i] = ((255_i32 << HSV_SHIFT) as f64 / i as f64).round() as i32;
            hue[i] = (((HUE_RANGE as i32) << HSV_SHIFT) as f64 / (6.0 * i as f64)).round() as i32;
        }
        DivisionTables { saturation, hue }
    })
}

/// Convert one RGB pixel to 8-bit HSV.
///
/// Hue is in `[0, 180)`, saturation and value in `[0, 255]`. Uses 12-bit
/// fixed-point reciprocals with round-half-up, which reproduces the
/// common 8-bit colour conversion exactly.
pub fn rgb_to_hsv(red: u8, green: u8, blue: u8) -> [u8; 3] {
    let tables = division_tables();

    let (r, g, b) = (i32::from(red), i32::from(green), i32::from(blue));
    let value = r.max(g).max(b);
    let minimum = r.min(g).min(b);
    let delta = value - minimum;

    // All-ones masks select the branch without data-dependent jumps.
    let value_is_red = if value == r { -1 } else { 0 };
    let value_is_green = if value == g { -1 } else { 0 };

    let saturation = (delta * tables.saturation[value as usize] + HSV_ROUND) >> HSV_SHIFT;

    let mut hue = (value_is_red & (g - b))
        + (!value_is_red
            & ((value_is_green & (b - r + 2 * delta))
                + (!value_is_green & (r - g + 4 * delta))));
    hue = (hue * tables.hue[delta as usize] + HSV_ROUND) >> HSV_SHIFT;
    if hue < 0 {
        hue += HUE_RANGE as i32;
    }

    [hue as u8, saturation as u8, value as u8]
}

/// A unit-mass joint HSV histogram of one frame.
#[derive(Clone, PartialEq)]
pub struct HsvHistogram {
    bins: Vec<f32>,
}

impl std::fmt::Debug for HsvHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let occupied = self.bins.iter().filter(|&&mass| mass > 0.0).count();
        f.debug_struct("HsvHistogram")
            .field("bins", &TOTAL_BINS)
            .field("occupied", &occupied)
            .finish()
    }
}

impl HsvHistogram {
    /// Build the normalised histogram of `image`.
    ///
    /// An image with no pixels yields an all-zero histogram.
    pub fn from_image(image: &RgbImage) -> Self {
        let mut counts = vec![0_u32; TOTAL_BINS];
        for pixel in image.pixels() {
            let [red, green, blue] = pixel.0;
            let [hue, saturation, value] = rgb_to_hsv(red, green, blue);
            counts[bin_index(hue, saturation, value)] += 1;
        }

        let total: u64 = counts.iter().map(|&count| u64::from(count)).sum();
        let bins = if total == 0 {
            vec![0.0; TOTAL_BINS]
        } else {
            let scale = 1.0 / total as f64;
            counts
                .into_iter()
                .map(|count| (f64::from(count) * scale) as f32)
                .collect()
        };

        Self { bins }
    }

    /// Mass of the bin holding the given HSV triple.
    pub fn mass_at(&self, hue: u8, saturation: u8, value: u8) -> f32 {
        self.bins[bin_index(hue.min(HUE_RANGE as u8 - 1), saturation, value)]
    }

    /// Flattened bins, hue-major.
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Correlation coefficient between two histograms, in `[-1, 1]`.
    ///
    /// When either histogram has no variance the two are considered
    /// perfectly correlated and `1.0` is returned.
    pub fn correlation(&self, other: &HsvHistogram) -> f64 {
        let (mut s1, mut s2, mut s11, mut s12, mut s22) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (&a, &b) in self.bins.iter().zip(&other.bins) {
            let (a, b) = (f64::from(a), f64::from(b));
            s1 += a;
            s2 += b;
            s11 += a * a;
            s12 += a * b;
            s22 += b * b;
        }

        let scale = 1.0 / TOTAL_BINS as f64;
        let numerator = s12 - s1 * s2 * scale;
        let variance_a = s11 - s1 * s1 * scale;
        let variance_b = s22 - s2 * s2 * scale;
        let denominator_squared = variance_a * variance_b;

        // Unit-mass histograms have tiny absolute variances, so "vanishing"
        // is judged relative to the histograms' energy.
        if denominator_squared.abs() > f64::EPSILON * s11 * s22 {
            (numerator / denominator_squared.sqrt()).clamp(-1.0, 1.0)
        } else {
            1.0
        }
    }

    /// Histogram-correlation distance, `1 - max(0, correlation)`.
    pub fn difference(&self, other: &HsvHistogram) -> f64 {
        (1.0 - self.correlation(other).max(0.0)).clamp(0.0, 1.0)
    }
}

#[inline]
fn bin_index(hue: u8, saturation: u8, value: u8) -> usize {
    let hue_bin = usize::from(hue) * HUE_BINS / HUE_RANGE;
    let saturation_bin = usize::from(saturation) * SATURATION_BINS / CHANNEL_RANGE;
    let value_bin = usize::from(value) * VALUE_BINS / CHANNEL_RANGE;
    (hue_bin * SATURATION_BINS + saturation_bin) * VALUE_BINS + value_bin
}

/// Dissimilarity of two frames, in `[0, 1]`.
///
/// Pure and order-insensitive in its inputs' pixel order. Frame sizes may
/// differ.
pub fn difference(frame_a: &RgbImage, frame_b: &RgbImage) -> f64 {
    HsvHistogram::from_image(frame_a).difference(&HsvHistogram::from_image(frame_b))
}
