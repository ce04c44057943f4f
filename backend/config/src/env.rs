//! Environment handling for config values.
//!
//! - `${VAR_NAME}` in string values is replaced at load time. Only uppercase
//!   `[A-Z_][A-Z0-9_]*` names are matched; `$${VAR}` escapes to a literal
//!   `${VAR}`.
//! - Well-known variables fill fields the file leaves unset.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{
    AdviceConfig, MedsnapConfig, OllamaConfig, OpenRouterConfig, ReminderConfig, TelegramConfig,
};

/// `$${NAME}` (escaped) or `${NAME}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\$?)\{([A-Z_][A-Z0-9_]*)\}").unwrap());

pub const TELEGRAM_BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const OLLAMA_URL_VAR: &str = "OLLAMA_URL";
pub const OPENROUTER_API_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const REMINDER_TIME_VAR: &str = "MEDSNAP_REMINDER_TIME";

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree using the
/// process environment. Unset or empty variables are an error.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Collect all env var names referenced in a config value tree.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars_recursive(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

fn collect_vars_recursive(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in ENV_VAR_PATTERN.captures_iter(s) {
                if caps[1].is_empty() {
                    out.push(caps[2].to_string());
                }
            }
        }
        Value::Array(arr) => arr.iter().for_each(|v| collect_vars_recursive(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_vars_recursive(v, out)),
        _ => {}
    }
}

/// Fill unset fields from well-known environment variables.
pub fn apply_env_fallbacks(config: MedsnapConfig) -> MedsnapConfig {
    apply_env_fallbacks_with(config, &std::env::vars().collect())
}

pub fn apply_env_fallbacks_with(
    mut config: MedsnapConfig,
    env: &HashMap<String, String>,
) -> MedsnapConfig {
    let get = |name: &str| env.get(name).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(token) = get(TELEGRAM_BOT_TOKEN_VAR) {
        let telegram = config.telegram.get_or_insert_with(TelegramConfig::default);
        if telegram.bot_token.as_deref().map_or(true, str::is_empty) {
            telegram.bot_token = Some(token);
        }
    }

    if let Some(time) = get(REMINDER_TIME_VAR) {
        let reminder = config.reminder.get_or_insert_with(ReminderConfig::default);
        reminder.daily_time.get_or_insert(time);
    }

    if let Some(url) = get(OLLAMA_URL_VAR) {
        let advice = config.advice.get_or_insert_with(AdviceConfig::default);
        let ollama = advice.ollama.get_or_insert_with(OllamaConfig::default);
        ollama.base_url.get_or_insert(url);
    }

    if let Some(key) = get(OPENROUTER_API_KEY_VAR) {
        let advice = config.advice.get_or_insert_with(AdviceConfig::default);
        let openrouter = advice.openrouter.get_or_insert_with(OpenRouterConfig::default);
        if openrouter.api_key.as_deref().map_or(true, str::is_empty) {
            openrouter.api_key = Some(key);
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_simple_var() {
        let v = json!({"telegram": {"botToken": "${TELEGRAM_BOT_TOKEN}"}});
        let result = resolve_env_vars_with(&v, &env(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(result["telegram"]["botToken"], "123:abc");
    }

    #[test]
    fn error_on_missing_var_names_path() {
        let v = json!({"advice": {"openrouter": {"apiKey": "${MISSING_VAR}"}}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("MISSING_VAR"));
        assert!(err.contains("advice.openrouter.apiKey"));
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"fixedText": "cost: $${PRICE} and ${NAME}"});
        let result = resolve_env_vars_with(&v, &env(&[("NAME", "x")])).unwrap();
        assert_eq!(result["fixedText"], "cost: ${PRICE} and x");
    }

    #[test]
    fn passthrough_non_var_strings_and_numbers() {
        let v = json!({"key": "plain $ string", "n": 3, "list": ["a"]});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result, v);
    }

    #[test]
    fn collects_unescaped_vars_only() {
        let v = json!({"a": "${FOO}", "b": {"c": ["${BAR}", "$${BAZ}"]}});
        assert_eq!(collect_referenced_vars(&v), vec!["BAR".to_string(), "FOO".to_string()]);
    }

    #[test]
    fn fallbacks_fill_only_unset_fields() {
        let mut cfg = MedsnapConfig::default();
        cfg.reminder = Some(ReminderConfig {
            daily_time: Some("09:00".into()),
        });
        let cfg = apply_env_fallbacks_with(
            cfg,
            &env(&[
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
                ("MEDSNAP_REMINDER_TIME", "20:00"),
                ("OLLAMA_URL", "http://gpu-box:11434"),
                ("OPENROUTER_API_KEY", "sk-or-1"),
            ]),
        );
        assert_eq!(cfg.bot_token(), Some("123:abc"));
        assert_eq!(cfg.daily_time(), "09:00");
        assert_eq!(cfg.ollama_base_url(), "http://gpu-box:11434");
        assert_eq!(cfg.openrouter_api_key(), Some("sk-or-1"));
    }

    #[test]
    fn no_env_leaves_config_untouched() {
        let cfg = apply_env_fallbacks_with(MedsnapConfig::default(), &HashMap::new());
        assert_eq!(cfg, MedsnapConfig::default());
    }
}
