use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage};

use super::annotate::Annotator;
use crate::application::ports::ImageCodecPort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};

pub const JPEG_QUALITY: u8 = 90;

/// `image`-crate codec: format sniffed from magic bytes, JPEG out.
pub struct ImageCrateCodec {
    annotator: Annotator,
    quality: u8,
}

impl ImageCrateCodec {
    pub fn new(annotator: Annotator) -> Self {
        Self { annotator, quality: JPEG_QUALITY }
    }
}

impl ImageCodecPort for ImageCrateCodec {
    fn decode(&self, bytes: &[u8]) -> DomainResult<RgbImage> {
        if bytes.is_empty() {
            return Err(DomainError::InvalidInput("Invalid image: uploaded file is empty".into()));
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| DomainError::InvalidInput(format!("Invalid image: {e}")))?;
        if img.width() == 0 || img.height() == 0 {
            return Err(DomainError::InvalidInput("Invalid image: decoded to zero pixels".into()));
        }
        Ok(img.to_rgb8())
    }

    fn render_jpeg(&self, image: &RgbImage, detections: &[Detection]) -> DomainResult<Vec<u8>> {
        let mut canvas = image.clone();
        self.annotator.draw(&mut canvas, detections);

        let mut jpeg = Vec::new();
        let mut enc = JpegEncoder::new_with_quality(&mut jpeg, self.quality);
        enc.encode(canvas.as_raw(), canvas.width(), canvas.height(), ExtendedColorType::Rgb8)
            .map_err(|e| DomainError::OperationFailed(format!("JPEG encoding failed: {e}")))?;
        Ok(jpeg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(12, 9, Rgb([10, 120, 200]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_png() {
        let codec = ImageCrateCodec::new(Annotator::without_font());
        let img = codec.decode(&png_bytes()).unwrap();
        assert_eq!(img.dimensions(), (12, 9));
    }

    #[test]
    fn rejects_empty_and_corrupt_input() {
        let codec = ImageCrateCodec::new(Annotator::without_font());
        assert!(matches!(codec.decode(&[]), Err(DomainError::InvalidInput(_))));
        assert!(matches!(codec.decode(b"definitely not an image"), Err(DomainError::InvalidInput(_))));
        let mut truncated = png_bytes();
        truncated.truncate(20);
        assert!(matches!(codec.decode(&truncated), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn renders_jpeg() {
        let codec = ImageCrateCodec::new(Annotator::without_font());
        let img = codec.decode(&png_bytes()).unwrap();
        let jpeg = codec.render_jpeg(&img, &[]).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }
}
