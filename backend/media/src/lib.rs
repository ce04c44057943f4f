//! Image preprocessing for label photos.
//!
//! Decodes whatever the chat transport delivered, converts it to grayscale,
//! applies a binary threshold and re-encodes it as PNG for the OCR engine.

pub mod normalize;
pub mod mime_detect;

pub use normalize::{ImageNormalizer, NormalizeOptions, NormalizedImage};
pub use mime_detect::{detect_mime_type, is_image, sniff_image_mime};
