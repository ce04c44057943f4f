//! MedSnap runtime configuration schema.
//!
//! Every section and field is optional so a partial (or missing) file is
//! valid; `defaults::apply_all_defaults` fills the gaps. The accessors on
//! `MedsnapConfig` fall back to the same defaults, so callers never need to
//! unwrap.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedsnapConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<ReminderConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<AdviceConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderConfig {
    /// Local wall-clock time, `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceConfig {
    /// Ordered fallback chain: `ollama`, `openrouter`, `fixed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama: Option<OllamaConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter: Option<OpenRouterConfig>,

    /// Canned reply used by the `fixed` provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OllamaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRouterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tesseract_bin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_seg_mode: Option<u8>,
    /// Binarization cutoff; pixels brighter than this become white.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_idle_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_buffer: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling NDJSON logs; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl MedsnapConfig {
    pub fn bot_token(&self) -> Option<&str> {
        self.telegram
            .as_ref()
            .and_then(|t| t.bot_token.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn daily_time(&self) -> &str {
        self.reminder
            .as_ref()
            .and_then(|r| r.daily_time.as_deref())
            .unwrap_or(DEFAULT_DAILY_TIME)
    }

    pub fn advice_providers(&self) -> Vec<String> {
        self.advice
            .as_ref()
            .and_then(|a| a.providers.clone())
            .unwrap_or_else(|| vec![DEFAULT_ADVICE_PROVIDER.to_string()])
    }

    pub fn advice_timeout_secs(&self) -> u64 {
        self.advice
            .as_ref()
            .and_then(|a| a.timeout_secs)
            .unwrap_or(DEFAULT_ADVICE_TIMEOUT_SECS)
    }

    pub fn advice_max_tokens(&self) -> u32 {
        self.advice
            .as_ref()
            .and_then(|a| a.max_tokens)
            .unwrap_or(DEFAULT_ADVICE_MAX_TOKENS)
    }

    pub fn advice_temperature(&self) -> f32 {
        self.advice
            .as_ref()
            .and_then(|a| a.temperature)
            .unwrap_or(DEFAULT_ADVICE_TEMPERATURE)
    }

    pub fn fixed_text(&self) -> Option<&str> {
        self.advice.as_ref().and_then(|a| a.fixed_text.as_deref())
    }

    pub fn ollama_base_url(&self) -> &str {
        self.ollama()
            .and_then(|o| o.base_url.as_deref())
            .unwrap_or(DEFAULT_OLLAMA_URL)
    }

    pub fn ollama_model(&self) -> &str {
        self.ollama()
            .and_then(|o| o.model.as_deref())
            .unwrap_or(DEFAULT_OLLAMA_MODEL)
    }

    pub fn openrouter(&self) -> Option<&OpenRouterConfig> {
        self.advice.as_ref().and_then(|a| a.openrouter.as_ref())
    }

    pub fn openrouter_api_key(&self) -> Option<&str> {
        self.openrouter()
            .and_then(|o| o.api_key.as_deref())
            .filter(|k| !k.trim().is_empty())
    }

    fn ollama(&self) -> Option<&OllamaConfig> {
        self.advice.as_ref().and_then(|a| a.ollama.as_ref())
    }

    pub fn tesseract_bin(&self) -> &str {
        self.ocr
            .as_ref()
            .and_then(|o| o.tesseract_bin.as_deref())
            .unwrap_or(DEFAULT_TESSERACT_BIN)
    }

    pub fn ocr_language(&self) -> &str {
        self.ocr
            .as_ref()
            .and_then(|o| o.language.as_deref())
            .unwrap_or(DEFAULT_OCR_LANGUAGE)
    }

    pub fn ocr_page_seg_mode(&self) -> u8 {
        self.ocr
            .as_ref()
            .and_then(|o| o.page_seg_mode)
            .unwrap_or(DEFAULT_PAGE_SEG_MODE)
    }

    pub fn ocr_threshold(&self) -> u8 {
        self.ocr
            .as_ref()
            .and_then(|o| o.threshold)
            .unwrap_or(DEFAULT_THRESHOLD)
    }

    pub fn max_image_bytes(&self) -> usize {
        self.ocr
            .as_ref()
            .and_then(|o| o.max_image_bytes)
            .unwrap_or(DEFAULT_MAX_IMAGE_BYTES)
    }

    pub fn ocr_timeout_secs(&self) -> u64 {
        self.ocr
            .as_ref()
            .and_then(|o| o.timeout_secs)
            .unwrap_or(DEFAULT_OCR_TIMEOUT_SECS)
    }

    pub fn worker_idle_secs(&self) -> u64 {
        self.engine
            .as_ref()
            .and_then(|e| e.worker_idle_secs)
            .unwrap_or(DEFAULT_WORKER_IDLE_SECS)
    }

    pub fn inbound_buffer(&self) -> usize {
        self.engine
            .as_ref()
            .and_then(|e| e.inbound_buffer)
            .unwrap_or(DEFAULT_INBOUND_BUFFER)
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging
            .as_ref()
            .and_then(|l| l.dir.as_deref())
            .map(PathBuf::from)
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
telegram:
  botToken: "123:abc"
reminder:
  dailyTime: "08:30"
advice:
  providers: [openrouter, fixed]
  timeoutSecs: 20
  openrouter:
    apiKey: sk-or-test
ocr:
  pageSegMode: 4
  maxImageBytes: 1024
"#;
        let cfg: MedsnapConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.bot_token(), Some("123:abc"));
        assert_eq!(cfg.daily_time(), "08:30");
        assert_eq!(cfg.advice_providers(), vec!["openrouter", "fixed"]);
        assert_eq!(cfg.advice_timeout_secs(), 20);
        assert_eq!(cfg.openrouter_api_key(), Some("sk-or-test"));
        assert_eq!(cfg.ocr_page_seg_mode(), 4);
        assert_eq!(cfg.max_image_bytes(), 1024);
    }

    #[test]
    fn empty_config_reads_defaults() {
        let cfg = MedsnapConfig::default();
        assert_eq!(cfg.bot_token(), None);
        assert_eq!(cfg.daily_time(), "17:52");
        assert_eq!(cfg.advice_providers(), vec!["ollama"]);
        assert_eq!(cfg.ollama_base_url(), "http://localhost:11434");
        assert_eq!(cfg.ollama_model(), "qwen2.5:7b");
        assert_eq!(cfg.tesseract_bin(), "tesseract");
        assert_eq!(cfg.ocr_threshold(), 150);
        assert!(!cfg.log_json());
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let cfg = MedsnapConfig {
            telegram: Some(TelegramConfig {
                bot_token: Some("   ".into()),
            }),
            ..Default::default()
        };
        assert_eq!(cfg.bot_token(), None);
    }
}
