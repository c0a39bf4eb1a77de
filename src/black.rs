//! Black-frame filter.
//!
//! Classifies a frame as "black" when at least `black_ratio` of its pixels
//! have a luminance strictly below `black_threshold`. Fades, title cards
//! and leader frames are the usual hits.
//!
//! # Example
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use sceneshot::is_black;
//!
//! let frame = RgbImage::from_pixel(16, 16, Rgb([3, 3, 3]));
//! assert!(is_black(&frame, 15, 0.90));
//! ```

use image::RgbImage;

/// 8-bit luminance of an RGB pixel.
///
/// Uses the BT.601 weights in 14-bit fixed point with rounding, which is
/// bit-exact with the usual 8-bit colour-to-gray conversion.
#[inline]
pub fn luminance(red: u8, green: u8, blue: u8) -> u8 {
    const RED_WEIGHT: u32 = 4_899;
    const GREEN_WEIGHT: u32 = 9_617;
    const BLUE_WEIGHT: u32 = 1_868;
    const SHIFT: u32 = 14;

    let weighted = RED_WEIGHT * u32::from(red)
        + GREEN_WEIGHT * u32::from(green)
        + BLUE_WEIGHT * u32::from(blue)
        + (1 << (SHIFT - 1));
    (weighted >> SHIFT) as u8
}

/// Fraction of pixels in `image` whose luminance is strictly below
/// `threshold`. Returns `0.0` for an empty image.
pub fn black_pixel_ratio(image: &RgbImage, threshold: u8) -> f64 {
    let total = u64::from(image.width()) * u64::from(image.height());
    if total == 0 {
        return 0.0;
    }

    let dark = image
        .pixels()
        .filter(|pixel| {
            let [red, green, blue] = pixel.0;
            luminance(red, green, blue) < threshold
        })
        .count() as u64;

    dark as f64 / total as f64
}

/// Returns `true` when `image` is dominated by near-black pixels.
///
/// Pure and deterministic. An image with no pixels is never black.
pub fn is_black(image: &RgbImage, black_threshold: u8, black_ratio: f64) -> bool {
    if image.width() == 0 || image.height() == 0 {
        return false;
    }
    black_pixel_ratio(image, black_threshold) >= black_ratio
}
