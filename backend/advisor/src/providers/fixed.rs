use anyhow::Result;
use async_trait::async_trait;
use medsnap_core::{LlmProvider, LlmRequest, LlmResponse};

/// A provider that answers every request with the same canned text.
///
/// Useful for offline demos and as a last entry in a fallback chain.
pub struct FixedProvider {
    name: String,
    fixed_response: Option<String>,
}

impl FixedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }
}

#[async_trait]
impl LlmProvider for FixedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _req: &LlmRequest) -> Result<LlmResponse> {
        Ok(LlmResponse {
            content: self.fixed_response.clone().unwrap_or_else(|| {
                "No medication details are available offline. Please consult your pharmacist."
                    .to_string()
            }),
            provider: self.name.clone(),
            model: "fixed".to_string(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}
