//! `medsnap config check|show`.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;

use medsnap_config::{
    collect_redacted_paths, collect_referenced_vars, load_raw_config, prepare, redact,
    validate_for_serving, MedsnapConfig,
};

use crate::terminal_output::{note_error, note_success, note_warn, render_settings};

/// Validate the config as `serve` would and probe the OCR binary.
/// Returns whether everything passed.
pub async fn check(path: &Path) -> Result<bool> {
    println!("\n🔍 Checking {}\n", path.display());

    let raw = load_raw_config(path).await?;
    let env: HashMap<String, String> = std::env::vars().collect();
    let missing: Vec<String> = collect_referenced_vars(&raw)
        .into_iter()
        .filter(|var| !env.contains_key(var))
        .collect();
    if !missing.is_empty() {
        for var in &missing {
            note_error(&format!("${{{var}}} is referenced but not set"));
        }
        return Ok(false);
    }

    let config = prepare(&raw, &env)?;
    Ok(check_config(&config).await)
}

async fn check_config(config: &MedsnapConfig) -> bool {
    let report = validate_for_serving(config);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }

    let tesseract_ok = probe_tesseract(config.tesseract_bin()).await;

    println!(
        "\n{}",
        render_settings(&[
            ("reminder time", config.daily_time().to_string()),
            ("advice providers", config.advice_providers().join(" → ")),
            ("advice timeout", format!("{}s", config.advice_timeout_secs())),
            ("ollama", format!("{} ({})", config.ollama_base_url(), config.ollama_model())),
            (
                "ocr",
                format!(
                    "{} -l {} --psm {}",
                    config.tesseract_bin(),
                    config.ocr_language(),
                    config.ocr_page_seg_mode()
                )
            ),
            ("threshold", config.ocr_threshold().to_string()),
        ])
    );

    let ok = report.is_valid() && tesseract_ok;
    if ok {
        note_success("Configuration is valid.");
    } else {
        note_error("Configuration has problems; fix the errors above.");
    }
    ok
}

async fn probe_tesseract(binary: &str) -> bool {
    let status = Command::new(binary)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(s) if s.success() => {
            note_success(&format!("OCR binary '{binary}' is available"));
            true
        }
        Ok(s) => {
            note_error(&format!("OCR binary '{binary}' exited with {s}"));
            false
        }
        Err(e) => {
            note_error(&format!("OCR binary '{binary}' not runnable: {e}"));
            false
        }
    }
}

/// Render the effective config as YAML with secrets masked.
pub fn show(config: &MedsnapConfig) -> Result<String> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    let mut yaml =
        serde_yaml::to_string(&redact(&value)).context("Failed to render config as YAML")?;
    let masked = collect_redacted_paths(&value);
    if !masked.is_empty() {
        yaml.push_str(&format!("# masked: {}\n", masked.join(", ")));
    }
    Ok(yaml)
}
