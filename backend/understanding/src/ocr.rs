//! Optical Character Recognition (OCR)
//!
//! Runs the Tesseract CLI over a binarised label photo. The image is piped
//! through stdin and the recognised text read back from stdout, so nothing
//! touches the filesystem.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use medsnap_core::{ExtractError, TextExtractor};
use medsnap_media::{sniff_image_mime, ImageNormalizer};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Recognises text in an already-normalised PNG image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, png_bytes: &[u8]) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TesseractConfig {
    /// Binary name or absolute path.
    pub binary: String,
    /// Tesseract language code(s), e.g. "eng" or "eng+fra".
    pub language: String,
    /// Page segmentation mode. 6 = assume a single uniform block of text.
    pub page_seg_mode: u8,
    pub timeout_secs: u64,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
            page_seg_mode: 6,
            timeout_secs: 30,
        }
    }
}

/// OCR engine backed by the `tesseract` executable.
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .arg("--psm")
            .arg(self.config.page_seg_mode.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, png_bytes: &[u8]) -> Result<String, ExtractError> {
        let mut child = self.command().spawn().map_err(|e| {
            ExtractError::Engine(format!("failed to spawn {}: {e}", self.config.binary))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractError::Engine("tesseract stdin unavailable".into()))?;
        let input = png_bytes.to_vec();
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ExtractError::Engine(format!("tesseract timed out after {}s", timeout.as_secs()))
            })?
            .map_err(|e| ExtractError::Engine(format!("tesseract I/O error: {e}")))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed writing image to tesseract stdin"),
            Err(e) => warn!(error = %e, "Tesseract stdin writer panicked"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.len(), "Tesseract finished");
        Ok(text)
    }
}

/// Normaliser + OCR engine, exposed through the `TextExtractor` contract.
pub struct OcrPipeline {
    normalizer: ImageNormalizer,
    engine: Arc<dyn OcrEngine>,
}

impl OcrPipeline {
    pub fn new(normalizer: ImageNormalizer, engine: Arc<dyn OcrEngine>) -> Self {
        Self { normalizer, engine }
    }
}

#[async_trait]
impl TextExtractor for OcrPipeline {
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String, ExtractError> {
        info!(
            bytes = image_bytes.len(),
            format = sniff_image_mime(image_bytes).unwrap_or("unknown"),
            engine = self.engine.name(),
            "Running OCR"
        );

        let normalizer = self.normalizer.clone();
        let input = image_bytes.to_vec();
        let normalized = tokio::task::spawn_blocking(move || normalizer.normalize(&input))
            .await
            .map_err(|e| ExtractError::Engine(format!("image preprocessing panicked: {e}")))??;

        self.engine.recognize(&normalized.png_bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

    struct FakeEngine {
        text: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }

        async fn recognize(&self, png_bytes: &[u8]) -> Result<String, ExtractError> {
            assert!(png_bytes.starts_with(&[0x89, b'P', b'N', b'G']));
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    fn fake(text: &str) -> Arc<FakeEngine> {
        Arc::new(FakeEngine {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn label_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(16, 16, Rgb([200, 200, 200]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[tokio::test]
    async fn pipeline_feeds_png_to_engine() {
        let engine = fake("Paracetamol 500mg\n");
        let pipeline = OcrPipeline::new(ImageNormalizer::default(), engine.clone());

        let text = pipeline.extract_text(&label_png()).await.unwrap();
        assert_eq!(text, "Paracetamol 500mg\n");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undecodable_bytes_never_reach_engine() {
        let engine = fake("unused");
        let pipeline = OcrPipeline::new(ImageNormalizer::default(), engine.clone());

        let err = pipeline.extract_text(b"\x00\x01corrupt").await.unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_binary_is_an_engine_error() {
        let engine = TesseractEngine::new(TesseractConfig {
            binary: "/nonexistent/medsnap-tesseract".to_string(),
            ..Default::default()
        });
        let err = engine.recognize(&label_png()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Engine(_)));
    }

    #[test]
    fn default_config_matches_label_layout() {
        let cfg = TesseractConfig::default();
        assert_eq!(cfg.page_seg_mode, 6);
        assert_eq!(cfg.language, "eng");
    }
}
