//! Axis-aligned detector boxes in XYXY order.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::{Normalized, Pixel};

/// A detector box `(x1, y1, x2, y2)` tagged with its coordinate space.
///
/// Construction does not check ordering or finiteness: a detector near the
/// image border can report boxes that only make sense after clipping, and the
/// crop stage is the one that decides what to discard.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    #[inline]
    pub fn from_xyxy(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            _space: PhantomData,
        }
    }

    /// Builds a box from a `[x1, y1, x2, y2]` array as emitted on the wire.
    #[inline]
    pub fn from_array(coords: [f64; 4]) -> Self {
        Self::from_xyxy(coords[0], coords[1], coords[2], coords[3])
    }

    #[inline]
    pub fn to_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Width of the box; negative when `x2 < x1`.
    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Height of the box; negative when `y2 < y1`.
    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }
}

impl BBoxXYXY<Normalized> {
    /// Scales a normalized box into pixels of a `width` x `height` image.
    pub fn to_pixel(&self, width: f64, height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.x1 * width,
            self.y1 * height,
            self.x2 * width,
            self.y2 * height,
        )
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BBoxXYXY")
            .field(&self.x1)
            .field(&self.y1)
            .field(&self.x2)
            .field(&self.y2)
            .finish()
    }
}

impl<TSpace> Default for BBoxXYXY<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

// Serialised as a plain `[x1, y1, x2, y2]` array so no bounds land on TSpace.
impl<TSpace> Serialize for BBoxXYXY<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de, TSpace> Deserialize<'de> for BBoxXYXY<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coords = <[f64; 4]>::deserialize(deserializer)?;
        Ok(Self::from_array(coords))
    }
}
