//! Integer pixel rectangles.

use serde::{Deserialize, Serialize};

use super::{BBoxXYXY, Pixel};

/// A half-open pixel rectangle `[x1, x2) x [y1, y2)` inside an image.
///
/// Only produced by [`PixelRect::clip`], so `x1 < x2` and `y1 < y2` always hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelRect {
    /// Clips a pixel box to a `width` x `height` image.
    ///
    /// Coordinates are truncated toward zero, then each one is clamped into
    /// `[0, width]` or `[0, height]` on its own. Returns `None` when the
    /// clamped box has no area.
    pub fn clip(bbox: &BBoxXYXY<Pixel>, width: u32, height: u32) -> Option<Self> {
        let x1 = clamp_axis(bbox.x1, width);
        let y1 = clamp_axis(bbox.y1, height);
        let x2 = clamp_axis(bbox.x2, width);
        let y2 = clamp_axis(bbox.y2, height);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(Self { x1, y1, x2, y2 })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

fn clamp_axis(value: f64, extent: u32) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    // `as` saturates, so huge values land on u32::MAX before the clamp.
    (value.trunc().max(0.0) as u32).min(extent)
}

impl Serialize for PixelRect {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.x1, self.y1, self.x2, self.y2].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PixelRect {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x1, y1, x2, y2] = <[u32; 4]>::deserialize(deserializer)?;
        if x2 <= x1 || y2 <= y1 {
            return Err(serde::de::Error::custom(format!(
                "empty pixel rect [{x1}, {y1}, {x2}, {y2}]"
            )));
        }
        Ok(Self { x1, y1, x2, y2 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(x1: f64, y1: f64, x2: f64, y2: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(x1, y1, x2, y2)
    }

    #[test]
    fn clip_keeps_boxes_inside_the_image() {
        let rect = PixelRect::clip(&px(100.0, 100.0, 300.0, 300.0), 640, 480).expect("rect");
        assert_eq!(rect, PixelRect { x1: 100, y1: 100, x2: 300, y2: 300 });
        assert_eq!(rect.width(), 200);
        assert_eq!(rect.height(), 200);
    }

    #[test]
    fn clip_clamps_each_coordinate_independently() {
        let rect = PixelRect::clip(&px(-20.0, 400.0, 700.0, 900.0), 640, 480).expect("rect");
        assert_eq!(rect, PixelRect { x1: 0, y1: 400, x2: 640, y2: 480 });
    }

    #[test]
    fn clip_truncates_fractional_coordinates() {
        let rect = PixelRect::clip(&px(10.9, 5.2, 20.7, 15.99), 100, 100).expect("rect");
        assert_eq!(rect, PixelRect { x1: 10, y1: 5, x2: 20, y2: 15 });
    }

    #[test]
    fn clip_discards_zero_width_box() {
        assert!(PixelRect::clip(&px(50.0, 50.0, 50.0, 80.0), 640, 480).is_none());
    }

    #[test]
    fn clip_discards_box_fully_outside_the_image() {
        assert!(PixelRect::clip(&px(700.0, 10.0, 800.0, 20.0), 640, 480).is_none());
        assert!(PixelRect::clip(&px(-80.0, -40.0, -10.0, -5.0), 640, 480).is_none());
    }

    #[test]
    fn clip_treats_non_finite_as_origin() {
        assert!(PixelRect::clip(&px(f64::NAN, 0.0, f64::NAN, 10.0), 64, 64).is_none());
    }

    #[test]
    fn contains_is_half_open() {
        let rect = PixelRect { x1: 2, y1: 2, x2: 4, y2: 4 };
        assert!(rect.contains(2, 3));
        assert!(!rect.contains(4, 3));
    }

    #[test]
    fn deserialize_rejects_empty_rects() {
        assert!(serde_json::from_str::<PixelRect>("[5, 5, 5, 9]").is_err());
        let rect: PixelRect = serde_json::from_str("[1, 2, 3, 4]").expect("rect");
        assert_eq!(rect.width(), 2);
    }
}
