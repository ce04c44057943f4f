//! Config validation with user-friendly error messages.

use medsnap_scheduler::DailyTime;
use thiserror::Error;

use crate::schema::MedsnapConfig;

/// Advice providers the binary knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["ollama", "openrouter", "fixed"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &MedsnapConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_telegram(config, &mut report, false);
    validate_reminder(config, &mut report);
    validate_advice(config, &mut report);
    validate_ocr(config, &mut report);
    validate_engine(config, &mut report);
    report
}

/// Like [`validate`], but a missing bot token is an error.
pub fn validate_for_serving(config: &MedsnapConfig) -> ValidationReport {
    let mut report = validate(config);
    report.warnings.retain(|w| w.path != "telegram.botToken");
    validate_telegram(config, &mut report, true);
    report
}

fn validate_telegram(config: &MedsnapConfig, report: &mut ValidationReport, required: bool) {
    if config.bot_token().is_some() {
        return;
    }
    let message = "Telegram bot token is not set (telegram.botToken or TELEGRAM_BOT_TOKEN)";
    if required {
        report.error("telegram.botToken", message);
    } else {
        report.warn("telegram.botToken", message);
    }
}

fn validate_reminder(config: &MedsnapConfig, report: &mut ValidationReport) {
    if let Err(e) = config.daily_time().parse::<DailyTime>() {
        report.error("reminder.dailyTime", e.to_string());
    }
}

fn validate_advice(config: &MedsnapConfig, report: &mut ValidationReport) {
    let providers = config.advice_providers();
    if providers.is_empty() {
        report.error("advice.providers", "At least one advice provider is required");
    }

    let mut seen = Vec::new();
    for (i, name) in providers.iter().enumerate() {
        let path = format!("advice.providers[{i}]");
        if !KNOWN_PROVIDERS.contains(&name.as_str()) {
            report.error(
                &path,
                format!(
                    "Unknown advice provider '{name}'. Use one of: {}",
                    KNOWN_PROVIDERS.join(", ")
                ),
            );
        }
        if seen.contains(&name) {
            report.warn(&path, format!("Provider '{name}' is listed more than once"));
        }
        seen.push(name);
    }

    if providers.iter().any(|p| p == "openrouter") && config.openrouter_api_key().is_none() {
        report.error(
            "advice.openrouter.apiKey",
            "OpenRouter is selected but no API key is set (advice.openrouter.apiKey or OPENROUTER_API_KEY)",
        );
    }

    if config.advice_timeout_secs() == 0 {
        report.error("advice.timeoutSecs", "timeoutSecs must be > 0");
    }
    if config.advice_max_tokens() == 0 {
        report.error("advice.maxTokens", "maxTokens must be > 0");
    }
    let temperature = config.advice_temperature();
    if !(0.0..=2.0).contains(&temperature) {
        report.warn(
            "advice.temperature",
            format!("temperature {temperature} is outside the usual 0.0..=2.0 range"),
        );
    }
}

fn validate_ocr(config: &MedsnapConfig, report: &mut ValidationReport) {
    if config.tesseract_bin().trim().is_empty() {
        report.error("ocr.tesseractBin", "tesseractBin cannot be empty");
    }
    if config.ocr_language().trim().is_empty() {
        report.error("ocr.language", "language cannot be empty");
    }
    if config.ocr_page_seg_mode() > 13 {
        report.error("ocr.pageSegMode", "pageSegMode must be between 0 and 13");
    }
    if config.max_image_bytes() == 0 {
        report.error("ocr.maxImageBytes", "maxImageBytes must be > 0");
    }
    if config.ocr_timeout_secs() == 0 {
        report.error("ocr.timeoutSecs", "timeoutSecs must be > 0");
    }
}

fn validate_engine(config: &MedsnapConfig, report: &mut ValidationReport) {
    if config.worker_idle_secs() == 0 {
        report.error("engine.workerIdleSecs", "workerIdleSecs must be > 0");
    }
    if config.inbound_buffer() == 0 {
        report.error("engine.inboundBuffer", "inboundBuffer must be >= 1");
    }
}
