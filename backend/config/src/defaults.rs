//! Config defaults: fills every unset field so the printed config shows the
//! values actually in effect.

use crate::schema::{
    AdviceConfig, EngineSection, LoggingConfig, MedsnapConfig, OcrConfig, OllamaConfig,
    ReminderConfig,
};

pub const DEFAULT_DAILY_TIME: &str = "17:52";
pub const DEFAULT_ADVICE_PROVIDER: &str = "ollama";
pub const DEFAULT_ADVICE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ADVICE_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_ADVICE_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:7b";
pub const DEFAULT_TESSERACT_BIN: &str = "tesseract";
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const DEFAULT_PAGE_SEG_MODE: u8 = 6;
pub const DEFAULT_THRESHOLD: u8 = 150;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WORKER_IDLE_SECS: u64 = 300;
pub const DEFAULT_INBOUND_BUFFER: usize = 256;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: MedsnapConfig) -> MedsnapConfig {
    let config = apply_reminder_defaults(config);
    let config = apply_advice_defaults(config);
    let config = apply_ocr_defaults(config);
    let config = apply_engine_defaults(config);
    apply_logging_defaults(config)
}

fn apply_reminder_defaults(mut config: MedsnapConfig) -> MedsnapConfig {
    let reminder = config.reminder.get_or_insert_with(ReminderConfig::default);
    reminder
        .daily_time
        .get_or_insert_with(|| DEFAULT_DAILY_TIME.to_string());
    config
}

fn apply_advice_defaults(mut config: MedsnapConfig) -> MedsnapConfig {
    let advice = config.advice.get_or_insert_with(AdviceConfig::default);
    advice
        .providers
        .get_or_insert_with(|| vec![DEFAULT_ADVICE_PROVIDER.to_string()]);
    advice.timeout_secs.get_or_insert(DEFAULT_ADVICE_TIMEOUT_SECS);
    advice.max_tokens.get_or_insert(DEFAULT_ADVICE_MAX_TOKENS);
    advice.temperature.get_or_insert(DEFAULT_ADVICE_TEMPERATURE);

    let ollama = advice.ollama.get_or_insert_with(OllamaConfig::default);
    ollama
        .base_url
        .get_or_insert_with(|| DEFAULT_OLLAMA_URL.to_string());
    ollama
        .model
        .get_or_insert_with(|| DEFAULT_OLLAMA_MODEL.to_string());
    config
}

fn apply_ocr_defaults(mut config: MedsnapConfig) -> MedsnapConfig {
    let ocr = config.ocr.get_or_insert_with(OcrConfig::default);
    ocr.tesseract_bin
        .get_or_insert_with(|| DEFAULT_TESSERACT_BIN.to_string());
    ocr.language
        .get_or_insert_with(|| DEFAULT_OCR_LANGUAGE.to_string());
    ocr.page_seg_mode.get_or_insert(DEFAULT_PAGE_SEG_MODE);
    ocr.threshold.get_or_insert(DEFAULT_THRESHOLD);
    ocr.max_image_bytes.get_or_insert(DEFAULT_MAX_IMAGE_BYTES);
    ocr.timeout_secs.get_or_insert(DEFAULT_OCR_TIMEOUT_SECS);
    config
}

fn apply_engine_defaults(mut config: MedsnapConfig) -> MedsnapConfig {
    let engine = config.engine.get_or_insert_with(EngineSection::default);
    engine.worker_idle_secs.get_or_insert(DEFAULT_WORKER_IDLE_SECS);
    engine.inbound_buffer.get_or_insert(DEFAULT_INBOUND_BUFFER);
    config
}

fn apply_logging_defaults(mut config: MedsnapConfig) -> MedsnapConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}
