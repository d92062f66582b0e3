//! Pasting region patches back into the full image.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::geometry::PixelRect;

/// Writes `patch` over `rect` of `canvas` and returns the canvas.
///
/// The patch is resized to exactly `rect`'s extent first (bilinear) unless it
/// already has that size. Pixels outside `rect` are untouched.
pub fn composite_region(mut canvas: RgbImage, rect: &PixelRect, patch: &RgbImage) -> RgbImage {
    let resized;
    let patch = if patch.dimensions() == (rect.width(), rect.height()) {
        patch
    } else {
        resized = imageops::resize(patch, rect.width(), rect.height(), FilterType::Triangle);
        &resized
    };
    imageops::replace(&mut canvas, patch, i64::from(rect.x1), i64::from(rect.y1));
    canvas
}

/// Folds [`composite_region`] over `regions` in order; where regions overlap
/// the later one wins.
pub fn composite_regions<'a, I>(canvas: RgbImage, regions: I) -> RgbImage
where
    I: IntoIterator<Item = (&'a PixelRect, &'a RgbImage)>,
{
    regions
        .into_iter()
        .fold(canvas, |canvas, (rect, patch)| composite_region(canvas, rect, patch))
}
