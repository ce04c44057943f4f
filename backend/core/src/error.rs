use thiserror::Error;

/// Top-level error type for the MedSnap runtime.
#[derive(Debug, Error)]
pub enum MedsnapError {
    #[error("LLM provider error ({provider}): {message}")]
    LlmError { provider: String, message: String },

    #[error("all advice providers failed")]
    AllProvidersFailed,

    #[error("advice request timed out after {0}s")]
    AdviceTimeout(u64),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Failure modes of the `image bytes -> text` contract.
///
/// An image with no readable text is *not* an error; it yields an empty string.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The bytes could not be decoded as an image (corrupt, truncated, unsupported codec).
    #[error("could not decode image: {0}")]
    Decode(String),

    /// The image exceeds the configured size limit.
    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    /// The OCR engine itself failed (binary missing, crashed, timed out).
    #[error("OCR engine failed: {0}")]
    Engine(String),
}

impl ExtractError {
    /// Whether the failure lies with the user's input rather than the engine.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ExtractError::Decode(_) | ExtractError::TooLarge { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_classified() {
        assert!(ExtractError::Decode("bad header".into()).is_input_error());
        assert!(ExtractError::TooLarge { size: 10, limit: 5 }.is_input_error());
        assert!(!ExtractError::Engine("tesseract not found".into()).is_input_error());
    }

    #[test]
    fn timeout_message_mentions_seconds() {
        assert_eq!(
            MedsnapError::AdviceTimeout(60).to_string(),
            "advice request timed out after 60s"
        );
    }
}
