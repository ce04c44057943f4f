use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat};
use medsnap_core::ExtractError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default binarisation cut-off; pixels brighter than this become white.
pub const DEFAULT_THRESHOLD: u8 = 150;

/// Largest attachment accepted before decoding.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeOptions {
    pub threshold: u8,
    pub max_image_bytes: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// A binarised image ready for OCR.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Lossless PNG encoding of the thresholded grayscale image.
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Grayscale + binary threshold filter.
///
/// Decoding is CPU bound; async callers should run it on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    options: NormalizeOptions,
}

impl ImageNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::Decode("empty attachment".into()));
        }
        if bytes.len() > self.options.max_image_bytes {
            return Err(ExtractError::TooLarge {
                size: bytes.len(),
                limit: self.options.max_image_bytes,
            });
        }

        let decoded =
            image::load_from_memory(bytes).map_err(|e| ExtractError::Decode(e.to_string()))?;

        let mut gray = decoded.to_luma8();
        apply_threshold(&mut gray, self.options.threshold);
        let (width, height) = gray.dimensions();

        debug!(width, height, threshold = self.options.threshold, "Image binarised");

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractError::Engine(format!("PNG encoding failed: {e}")))?;

        Ok(NormalizedImage {
            png_bytes: cursor.into_inner(),
            width,
            height,
        })
    }
}

/// Pixels strictly above `threshold` become white, everything else black.
pub fn apply_threshold(image: &mut GrayImage, threshold: u8) {
    for pixel in image.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn make_test_image(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn decode_gray(bytes: &[u8]) -> GrayImage {
        image::load_from_memory(bytes).unwrap().to_luma8()
    }

    #[test]
    fn threshold_splits_at_cutoff() {
        let mut img = GrayImage::from_fn(3, 1, |x, _| Luma([[150u8, 151, 20][x as usize]]));
        apply_threshold(&mut img, 150);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 255);
        assert_eq!(img.get_pixel(2, 0).0[0], 0);
    }

    #[test]
    fn light_image_becomes_white() {
        let normalizer = ImageNormalizer::default();
        let out = normalizer.normalize(&make_test_image(8, 4, [240, 240, 240])).unwrap();
        assert_eq!((out.width, out.height), (8, 4));
        let gray = decode_gray(&out.png_bytes);
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn dark_image_becomes_black() {
        let normalizer = ImageNormalizer::default();
        let out = normalizer.normalize(&make_test_image(5, 5, [30, 60, 90])).unwrap();
        let gray = decode_gray(&out.png_bytes);
        assert!(gray.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let normalizer = ImageNormalizer::default();
        let err = normalizer.normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }

    #[test]
    fn empty_bytes_are_a_decode_error() {
        let err = ImageNormalizer::default().normalize(&[]).unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }

    #[test]
    fn oversize_is_rejected_before_decoding() {
        let normalizer = ImageNormalizer::new(NormalizeOptions {
            max_image_bytes: 16,
            ..Default::default()
        });
        let err = normalizer.normalize(&make_test_image(8, 8, [0, 0, 0])).unwrap_err();
        assert!(matches!(err, ExtractError::TooLarge { limit: 16, .. }));
    }
}
