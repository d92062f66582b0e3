//! Box drawing for annotated output images.
//!
//! Each detection gets a class-colored outline and a filled tab at its
//! top-left corner carrying `"<class> <confidence>"`. The tab is drawn inside
//! the box so that annotating a crop never reaches outside the crop.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::detection::Detection;
use crate::error::BerryscanError;
use crate::geometry::PixelRect;

const DEFAULT_LINE_WIDTH: u32 = 4;
const DEFAULT_FONT_SIZE: f32 = 10.0;

const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

fn default_line_width() -> u32 {
    DEFAULT_LINE_WIDTH
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

/// How detections are drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotationStyle {
    /// Outline thickness in pixels.
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    /// Label text height in pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// TrueType/OpenType font for labels. When unset a common system font is
    /// used if one is installed; without any font only boxes are drawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            font_size: DEFAULT_FONT_SIZE,
            font: None,
        }
    }
}

const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [44, 153, 168],
    [0, 194, 255],
];

/// Outline color for a class; stable across images and runs.
pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// The text written on a detection's tab.
pub fn label_text(detection: &Detection) -> String {
    format!("{} {:.2}", detection.class_name, detection.confidence)
}

/// Loads the font at `path`.
pub fn load_font(path: &Path) -> Result<FontArc, BerryscanError> {
    let data = fs::read(path).map_err(BerryscanError::Io)?;
    FontArc::try_from_vec(data).map_err(|err| BerryscanError::ConfigInvalid {
        message: format!("{} is not a usable font: {err}", path.display()),
    })
}

/// The first font found in the usual system locations.
pub fn system_font() -> Option<FontArc> {
    SYSTEM_FONTS.iter().find_map(|path| {
        let data = fs::read(path).ok()?;
        let font = FontArc::try_from_vec(data).ok()?;
        debug!("using label font {}", path);
        Some(font)
    })
}

/// An [`AnnotationStyle`] together with the font it draws labels in.
#[derive(Clone, Debug, Default)]
pub struct Annotator {
    style: AnnotationStyle,
    font: Option<FontArc>,
}

impl Annotator {
    pub fn new(style: AnnotationStyle, font: Option<FontArc>) -> Self {
        Self { style, font }
    }

    /// Loads the style's font, or falls back to a system font.
    ///
    /// A configured font that cannot be read is an error; a missing system
    /// font only means labels are left out.
    pub fn from_style(style: AnnotationStyle) -> Result<Self, BerryscanError> {
        let font = match &style.font {
            Some(path) => Some(load_font(path)?),
            None => {
                let font = system_font();
                if font.is_none() {
                    warn!("no label font found; annotated images will have boxes only");
                }
                font
            }
        };
        Ok(Self::new(style, font))
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn draw(&self, image: &mut RgbImage, detections: &[Detection]) {
        draw_detections(image, detections, &self.style, self.font.as_ref());
    }
}

/// Draws every detection as a class-colored outline with a filled tab at its
/// top-left corner, labelled with the class and confidence when a font is
/// given.
///
/// Boxes are clipped to the image first; boxes with no visible area are
/// skipped.
pub fn draw_detections(
    image: &mut RgbImage,
    detections: &[Detection],
    style: &AnnotationStyle,
    font: Option<&FontArc>,
) {
    let (width, height) = image.dimensions();
    let line_width = style.line_width.max(1);
    let scale = PxScale::from(style.font_size.max(1.0));

    for detection in detections {
        let Some(rect) = PixelRect::clip(&detection.bbox, width, height) else {
            continue;
        };
        let color = class_color(detection.class_id);

        // Nested 1px outlines, shrinking inward, give the requested thickness.
        for inset in 0..line_width {
            let w = rect.width().saturating_sub(2 * inset);
            let h = rect.height().saturating_sub(2 * inset);
            if w == 0 || h == 0 {
                break;
            }
            let outline = Rect::at((rect.x1 + inset) as i32, (rect.y1 + inset) as i32).of_size(w, h);
            draw_hollow_rect_mut(image, outline, color);
        }

        let Some(font) = font else {
            let tab = (line_width * 3).min(rect.width()).min(rect.height());
            if tab > 0 {
                draw_filled_rect_mut(
                    image,
                    Rect::at(rect.x1 as i32, rect.y1 as i32).of_size(tab, tab),
                    color,
                );
            }
            continue;
        };

        let label = label_text(detection);
        let (text_w, text_h) = text_size(scale, font, &label);
        let pad = line_width / 2 + 1;
        let tab_w = (text_w + 2 * pad).min(rect.width());
        let tab_h = (text_h + 2 * pad).min(rect.height());
        if tab_w == 0 || tab_h == 0 {
            continue;
        }
        draw_filled_rect_mut(
            image,
            Rect::at(rect.x1 as i32, rect.y1 as i32).of_size(tab_w, tab_h),
            color,
        );

        // Text is clipped to the tab so a small box never spills its label.
        let mut tab_image = RgbImage::from_pixel(tab_w, tab_h, color);
        draw_text_mut(
            &mut tab_image,
            LABEL_TEXT_COLOR,
            pad as i32,
            pad as i32,
            scale,
            font,
            &label,
        );
        image::imageops::replace(image, &tab_image, i64::from(rect.x1), i64::from(rect.y1));
    }
}
