use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use medsnap_core::{AdviceProvider, AdviceRequest, LlmProvider, LlmRequest, MedsnapError};

use crate::prompt::{build_user_prompt, format_advice, SYSTEM_PROMPT};
use crate::providers::ProviderRegistry;

/// Generation knobs shared by every provider in the chain.
#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

/// Looks up medication guidance through an ordered chain of LLM providers.
///
/// Providers are tried in order; the first non-empty answer wins.
pub struct MedicationAdvisor {
    providers: Vec<Arc<dyn LlmProvider>>,
    settings: AdvisorSettings,
}

impl MedicationAdvisor {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, settings: AdvisorSettings) -> Self {
        Self {
            providers,
            settings,
        }
    }

    /// Build the chain from configured provider names.
    pub fn from_registry(
        registry: &ProviderRegistry,
        names: &[String],
        settings: AdvisorSettings,
    ) -> Result<Self, MedsnapError> {
        let providers = registry.get_providers(names);
        if providers.is_empty() {
            return Err(MedsnapError::ConfigError(format!(
                "none of the advice providers {:?} are registered (available: {:?})",
                names,
                registry.list()
            )));
        }
        Ok(Self::new(providers, settings))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl AdviceProvider for MedicationAdvisor {
    fn name(&self) -> &str {
        "medication-advisor"
    }

    async fn get_advice(&self, request: &AdviceRequest) -> Result<String> {
        let llm_request = LlmRequest {
            model: None,
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(&request.medication_text),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let mut last_error: Option<MedsnapError> = None;

        for provider in &self.providers {
            let name = provider.name().to_string();
            debug!(provider = %name, "Calling provider");

            match provider.complete(&llm_request).await {
                Ok(response) if !response.content.trim().is_empty() => {
                    info!(
                        provider = %name,
                        model = %response.model,
                        tokens = response.tokens_used,
                        latency_ms = response.latency_ms,
                        "Advice generated"
                    );
                    return Ok(format_advice(&response.content));
                }
                Ok(_) => {
                    warn!(provider = %name, "Provider returned empty content");
                    last_error = Some(MedsnapError::LlmError {
                        provider: name,
                        message: "empty response".to_string(),
                    });
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "Provider failed");
                    last_error = Some(MedsnapError::LlmError {
                        provider: name,
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or(MedsnapError::AllProvidersFailed).into())
    }
}
