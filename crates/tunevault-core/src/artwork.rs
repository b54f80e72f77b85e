//! Artwork variant selection.
//!
//! Platforms describe a thumbnail as a manifest of variants at different
//! resolutions and byte sizes. The selectors here are pure functions over
//! such a manifest; presentation code calls them directly and nothing else
//! in the crate depends on them.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

/// Hard byte-size ceiling for any selected variant.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// One entry of an artwork manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoded size in bytes.
    pub byte_count: u64,
}

impl ImageVariant {
    /// Create a manifest entry.
    #[must_use]
    pub const fn new(width: u32, height: u32, byte_count: u64) -> Self {
        Self {
            width,
            height,
            byte_count,
        }
    }

    /// Pixel count of the variant.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// The variant whose pixel count is closest to `target_pixel_count`.
///
/// Variants over the byte ceiling `min(10 x target, 5 MiB)` are excluded.
/// Returns `None` when no variant qualifies. Ties go to the earliest
/// qualifying variant.
#[must_use]
pub fn select_best_fit(
    variants: &[ImageVariant],
    target_pixel_count: u64,
) -> Option<ImageVariant> {
    let ceiling = target_pixel_count.saturating_mul(10).min(MAX_IMAGE_BYTES);
    variants
        .iter()
        .filter(|v| v.byte_count <= ceiling)
        .min_by_key(|v| v.area().abs_diff(target_pixel_count))
        .copied()
}

/// The smallest-resolution variant strictly under the byte ceiling.
///
/// Ties go to the earliest qualifying variant.
#[must_use]
pub fn select_lowest_resolution(variants: &[ImageVariant]) -> Option<ImageVariant> {
    variants
        .iter()
        .filter(|v| v.byte_count < MAX_IMAGE_BYTES)
        .min_by_key(|v| v.area())
        .copied()
}

/// The largest-resolution variant strictly under the byte ceiling.
///
/// Ties go to the earliest qualifying variant.
#[must_use]
pub fn select_highest_resolution(variants: &[ImageVariant]) -> Option<ImageVariant> {
    variants
        .iter()
        .filter(|v| v.byte_count < MAX_IMAGE_BYTES)
        .min_by_key(|v| Reverse(v.area()))
        .copied()
}
