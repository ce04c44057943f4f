//! Builds runtime components from a loaded config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use medsnap_advisor::providers::fixed::FixedProvider;
use medsnap_advisor::providers::ollama::OllamaProvider;
use medsnap_advisor::providers::openrouter::OpenRouterProvider;
use medsnap_advisor::{AdvisorSettings, MedicationAdvisor, ProviderRegistry};
use medsnap_config::MedsnapConfig;
use medsnap_conversation::EngineConfig;
use medsnap_logging::LogOptions;
use medsnap_media::{ImageNormalizer, NormalizeOptions};
use medsnap_scheduler::DailyTime;
use medsnap_understanding::{OcrPipeline, TesseractConfig, TesseractEngine};

pub fn log_options(config: &MedsnapConfig) -> LogOptions {
    LogOptions {
        level: config.log_level().to_string(),
        dir: config.log_dir(),
        json: config.log_json(),
    }
}

pub fn daily_time(config: &MedsnapConfig) -> Result<DailyTime> {
    config
        .daily_time()
        .parse()
        .context("reminder.dailyTime is not a valid HH:MM time")
}

pub fn build_extractor(config: &MedsnapConfig) -> OcrPipeline {
    let normalizer = ImageNormalizer::new(NormalizeOptions {
        threshold: config.ocr_threshold(),
        max_image_bytes: config.max_image_bytes(),
    });
    let engine = TesseractEngine::new(TesseractConfig {
        binary: config.tesseract_bin().to_string(),
        language: config.ocr_language().to_string(),
        page_seg_mode: config.ocr_page_seg_mode(),
        timeout_secs: config.ocr_timeout_secs(),
    });
    OcrPipeline::new(normalizer, Arc::new(engine))
}

/// Register every provider the config can support.
pub fn build_registry(config: &MedsnapConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    registry.register(
        "ollama",
        Arc::new(
            OllamaProvider::new()
                .with_base_url(config.ollama_base_url())
                .with_model(config.ollama_model()),
        ),
    );
    info!(url = %config.ollama_base_url(), model = %config.ollama_model(), "Registered Ollama provider");

    if let Some(api_key) = config.openrouter_api_key() {
        let mut provider = OpenRouterProvider::new(api_key);
        if let Some(openrouter) = config.openrouter() {
            if let Some(url) = &openrouter.base_url {
                provider = provider.with_base_url(url.as_str());
            }
            if let Some(model) = &openrouter.model {
                provider = provider.with_model(model.as_str());
            }
        }
        registry.register("openrouter", Arc::new(provider));
        info!("Registered OpenRouter provider");
    }

    let mut fixed = FixedProvider::new("fixed");
    if let Some(text) = config.fixed_text() {
        fixed = fixed.with_response(text);
    }
    registry.register("fixed", Arc::new(fixed));

    registry
}

pub fn build_advisor(config: &MedsnapConfig) -> Result<MedicationAdvisor> {
    let registry = build_registry(config);
    let settings = AdvisorSettings {
        max_tokens: config.advice_max_tokens(),
        temperature: config.advice_temperature(),
    };
    let advisor = MedicationAdvisor::from_registry(&registry, &config.advice_providers(), settings)?;
    info!(providers = ?advisor.provider_names(), "Advice chain ready");
    Ok(advisor)
}

pub fn engine_config(config: &MedsnapConfig) -> EngineConfig {
    EngineConfig {
        advice_timeout: Duration::from_secs(config.advice_timeout_secs()),
        worker_idle: Duration::from_secs(config.worker_idle_secs()),
    }
}
