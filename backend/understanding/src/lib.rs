pub mod ocr;

pub use ocr::{OcrEngine, OcrPipeline, TesseractConfig, TesseractEngine};
