use anyhow::Result;
use async_trait::async_trait;

use crate::error::ExtractError;
use crate::message::Button;
use crate::types::{AdviceRequest, ChatId, MessageRef};

/// Turns raw image bytes into the text printed on them.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns an empty string when no text is found and
    /// `ExtractError::Decode` when the bytes are not a readable image.
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Produces human-readable guidance for confirmed medication text.
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Look up advice for the confirmed text. Errors are handled by the caller.
    async fn get_advice(&self, request: &AdviceRequest) -> Result<String>;
}

/// Outbound side of a chat transport.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Human-readable gateway name for logging.
    fn name(&self) -> &str;

    async fn send_text(&self, chat_id: ChatId, text: &str, buttons: &[Button]) -> Result<()>;

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<()>;

    /// Acknowledge a button press so the client stops showing a spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

/// Trait for LLM backends used by the advisor.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openrouter", "ollama").
    fn name(&self) -> &str;

    /// Send a completion request and return the response text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Overrides the provider's configured model when set.
    pub model: Option<String>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
