//! Bounding-box rendering for annotated responses.
//!
//! Boxes are always drawn. Label tags (`"<class> <confidence>"`) need a font:
//! either an explicit path or the first system font found. When none is
//! available, tags are skipped.

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info};

use crate::domain::detection::Detection;

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Per-class colours, cycled by class id.
const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38], [0xFF, 0x9D, 0x97], [0xFF, 0x70, 0x1F], [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31], [0x48, 0xF9, 0x0A], [0x92, 0xCC, 0x17], [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34], [0x00, 0xD4, 0xBB], [0x2C, 0x99, 0xA8], [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93], [0x64, 0x73, 0xFF], [0x00, 0x18, 0xEC], [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85], [0xCB, 0x38, 0xFF], [0xFF, 0x95, 0xC8], [0xFF, 0x37, 0xC7],
];

const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Line width grows with the image so boxes stay visible on large photos.
pub fn line_width(width: u32, height: u32) -> u32 {
    let lw = ((width + height) as f32 / 2.0 * 0.003).round() as u32;
    lw.max(2)
}

#[derive(Default)]
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn with_font_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|_| anyhow::anyhow!("failed to parse font file: {}", path.display()))?;
        Ok(Self { font: Some(font) })
    }

    pub fn with_system_font() -> Self {
        for path in &SYSTEM_FONTS {
            if let Ok(data) = std::fs::read(path) {
                if let Ok(font) = FontVec::try_from_vec(data) {
                    info!("label font: {}", path);
                    return Self { font: Some(font) };
                }
            }
        }
        debug!("no system font found, labels will not be drawn");
        Self::without_font()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn draw(&self, img: &mut RgbImage, detections: &[Detection]) {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let thickness = line_width(w, h);

        for det in detections {
            let color = class_color(det.class_id);
            let x = det.x1.round() as i32;
            let y = det.y1.round() as i32;
            let bw = det.width().round() as u32;
            let bh = det.height().round() as u32;

            for t in 0..thickness {
                let (iw, ih) = (bw.saturating_sub(2 * t), bh.saturating_sub(2 * t));
                if iw == 0 || ih == 0 {
                    break;
                }
                let rect = Rect::at(x + t as i32, y + t as i32).of_size(iw, ih);
                draw_hollow_rect_mut(img, rect, color);
            }

            if let Some(font) = &self.font {
                let text = format!("{} {:.2}", det.label, det.confidence());
                let scale = PxScale::from((thickness * 6).max(14) as f32);
                let (tw, th) = text_size(scale, font, &text);
                let pad = 2u32;
                let tag_h = th + 2 * pad;
                // above the box when there is room, else inside its top edge
                let tag_y = if y >= tag_h as i32 { y - tag_h as i32 } else { y };
                draw_filled_rect_mut(img, Rect::at(x, tag_y).of_size(tw + 2 * pad, tag_h), color);
                draw_text_mut(img, TEXT_COLOR, x + pad as i32, tag_y + pad as i32, scale, font, &text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection { x1, y1, x2, y2, score: 0.5, class_id: 0, label: "bottle".into() }
    }

    #[test]
    fn draws_box_outline_only() {
        let mut img = RgbImage::new(40, 40);
        Annotator::without_font().draw(&mut img, &[det(5.0, 5.0, 30.0, 30.0)]);
        assert_eq!(*img.get_pixel(5, 5), class_color(0));
        assert_eq!(*img.get_pixel(29, 17), class_color(0));
        // interior untouched
        assert_eq!(*img.get_pixel(17, 17), Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_and_offscreen_boxes_do_not_panic() {
        let mut img = RgbImage::new(16, 16);
        Annotator::without_font().draw(
            &mut img,
            &[det(3.0, 3.0, 3.0, 3.0), det(10.0, 10.0, 100.0, 100.0), det(-5.0, -5.0, 2.0, 2.0)],
        );
    }

    #[test]
    fn line_width_scales_with_size() {
        assert_eq!(line_width(100, 100), 2);
        assert_eq!(line_width(2000, 2000), 6);
    }

    #[test]
    fn missing_font_is_reported() {
        assert!(!Annotator::without_font().has_font());
        assert!(Annotator::with_font_path(Path::new("/nonexistent/font.ttf")).is_err());
    }

    #[test]
    fn palette_cycles() {
        assert_eq!(class_color(0), class_color(PALETTE.len()));
    }
}
