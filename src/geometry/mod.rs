//! Geometry shared by the detectors and the two-stage pipeline.
//!
//! Detector output stays in floating point ([`BBoxXYXY`]) until the crop
//! stage clips it into an integer [`PixelRect`].

mod bbox;
mod rect;
mod space;

pub use bbox::BBoxXYXY;
pub use rect::PixelRect;
pub use space::{Normalized, Pixel};
