//! Region crops.

use image::{imageops, RgbImage};

use crate::detect::Detection;
use crate::geometry::PixelRect;

/// A region proposal cut out of the source image.
#[derive(Clone, Debug)]
pub struct RegionCrop {
    /// The locator detection the crop came from, unclipped.
    pub detection: Detection,
    pub rect: PixelRect,
    pub image: RgbImage,
}

/// Cuts the region of `detection` out of `image`.
///
/// The box is clipped with [`PixelRect::clip`]; `None` means the clipped box
/// had no area and the region produces nothing.
pub fn extract_region(image: &RgbImage, detection: &Detection) -> Option<RegionCrop> {
    let rect = PixelRect::clip(&detection.bbox, image.width(), image.height())?;
    let sub = imageops::crop_imm(image, rect.x1, rect.y1, rect.width(), rect.height()).to_image();
    Some(RegionCrop {
        detection: detection.clone(),
        rect,
        image: sub,
    })
}
