//! Config file location and loading.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Env var overriding the config directory.
pub const CONFIG_DIR_VAR: &str = "MEDSNAP_CONFIG_DIR";

/// Resolve the MedSnap config directory.
/// Priority: `MEDSNAP_CONFIG_DIR` env > `~/.medsnap/` > `./.medsnap`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_VAR) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".medsnap"),
        None => PathBuf::from(".medsnap"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// An explicit `--config` path wins over the config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config_file_path(&config_dir()))
}

/// Read the YAML file as an untyped tree, before env substitution.
///
/// Returns an empty object if the file doesn't exist (first run).
pub async fn load_raw_config(path: &Path) -> Result<Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Option<Value> = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    // An empty file parses as null.
    Ok(value.unwrap_or_else(|| Value::Object(Default::default())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_raw_config(&dir.path().join("nope.yaml")).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn empty_file_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "").unwrap();
        assert_eq!(load_raw_config(&path).await.unwrap(), serde_json::json!({}));
    }

    #[tokio::test]
    async fn invalid_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "reminder: [unclosed").unwrap();
        let err = load_raw_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/etc/medsnap.yaml");
        assert_eq!(resolve_config_path(Some(p)), PathBuf::from("/etc/medsnap.yaml"));
        assert!(resolve_config_path(None).ends_with("config.yaml"));
    }
}
