//! `medsnap-config` — MedSnap runtime configuration.
//!
//! Provides:
//! - Typed config schema with camelCase YAML keys
//! - `${ENV_VAR}` substitution and well-known env fallbacks
//! - Default value application
//! - Validation reports
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_fallbacks, apply_env_fallbacks_with, collect_referenced_vars, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_raw_config, resolve_config_path};
pub use redact::{collect_redacted_paths, redact};
pub use schema::MedsnapConfig;
pub use validation::{validate, validate_for_serving, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Substitute env vars, apply env fallbacks and defaults to a raw tree.
pub fn prepare(raw: &Value, env: &HashMap<String, String>) -> Result<MedsnapConfig> {
    let value = resolve_env_vars_with(raw, env).context("Failed to resolve env vars in config")?;

    let config: MedsnapConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;

    let config = apply_env_fallbacks_with(config, env);
    Ok(apply_all_defaults(config))
}

/// Load, substitute env vars and apply defaults, without validating.
pub async fn load(path: &Path) -> Result<MedsnapConfig> {
    let raw = load_raw_config(path).await?;
    prepare(&raw, &std::env::vars().collect())
}

/// Log a report and turn its errors into a single `Err`.
pub fn ensure_valid(report: &ValidationReport) -> Result<()> {
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let summary = report
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        bail!("invalid configuration ({} error(s)): {summary}", report.errors.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn prepare_substitutes_and_fills_defaults() {
        let raw = serde_json::json!({
            "telegram": { "botToken": "${TELEGRAM_BOT_TOKEN}" },
            "advice": { "providers": ["fixed"] }
        });
        let cfg = prepare(&raw, &env(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(cfg.bot_token(), Some("123:abc"));
        assert_eq!(cfg.advice_providers(), vec!["fixed"]);
        assert_eq!(cfg.daily_time(), "17:52");
        assert!(validate_for_serving(&cfg).is_valid());
    }

    #[test]
    fn prepare_rejects_wrong_types() {
        let raw = serde_json::json!({ "advice": { "timeoutSecs": "soon" } });
        assert!(prepare(&raw, &HashMap::new()).is_err());
    }

    #[tokio::test]
    async fn load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "telegram:\n  botToken: \"42:secret-token\"\nreminder:\n  dailyTime: \"07:45\"\n",
        )
        .unwrap();

        let cfg = load(&path).await.unwrap();
        assert!(ensure_valid(&validate_for_serving(&cfg)).is_ok());
        assert_eq!(cfg.daily_time(), "07:45");
        assert_eq!(cfg.bot_token(), Some("42:secret-token"));
    }

    #[tokio::test]
    async fn serving_check_fails_on_invalid_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "telegram:\n  botToken: \"42:secret-token\"\nreminder:\n  dailyTime: \"25:00\"\n",
        )
        .unwrap();

        let cfg = load(&path).await.unwrap();
        let err = ensure_valid(&validate_for_serving(&cfg)).unwrap_err();
        assert!(err.to_string().contains("reminder.dailyTime"));
    }

    #[test]
    fn ensure_valid_passes_clean_report() {
        assert!(ensure_valid(&ValidationReport::default()).is_ok());
    }
}
