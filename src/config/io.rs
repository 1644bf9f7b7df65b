//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::{Path, PathBuf};

use super::types::Config;
use crate::error::{Error, Result};
use crate::sandbox::SandboxType;

/// A snapshot of the configuration file
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// Path to the config file
    pub path: PathBuf,
    /// Whether the file exists
    pub exists: bool,
    /// Parsed configuration
    pub config: Option<Config>,
    /// Problems reading or parsing the file
    pub issues: Vec<String>,
}

/// Load configuration with layered precedence:
/// 1. Config file if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    load_config_with(&super::paths::config_path())
}

/// Same as [`load_config`] but with an explicit file path
pub fn load_config_with(config_path: &Path) -> Result<Config> {
    let mut config = if config_path.exists() {
        load_config_from_path(config_path)?
    } else {
        Config::default()
    };

    // Apply environment variable overrides (highest precedence)
    apply_env_overrides(&mut config)?;

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try TOML first, then JSON5
        toml::from_str(&content)
            .map_err(|e| Error::Config(e.to_string()))
            .or_else(|_| json5::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any `SANDPOOL_*` variables.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Overlay overrides read through `lookup` onto `config`
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    // Sandbox overrides
    if let Some(root) = lookup("SANDPOOL_MOUNT_ROOT") {
        config.sandbox.mount_root = PathBuf::from(root);
    }
    if let Some(host) = lookup("SANDPOOL_ENDPOINT_HOST") {
        config.sandbox.endpoint_host = host;
    }
    if let Some(start) = lookup("SANDPOOL_PORT_START") {
        config.sandbox.port_range_start = parse_var("SANDPOOL_PORT_START", &start)?;
    }
    if let Some(attempts) = lookup("SANDPOOL_PORT_ATTEMPTS") {
        config.sandbox.port_scan_attempts = parse_var("SANDPOOL_PORT_ATTEMPTS", &attempts)?;
    }
    if let Some(runtime) = lookup("SANDPOOL_RUNTIME") {
        config.sandbox.runtime = runtime.parse()?;
    }
    if let Some(image) = lookup("SANDPOOL_DEFAULT_IMAGE") {
        config.sandbox.default_image = image;
    }
    if let Some(pull) = lookup("SANDPOOL_PULL_IMAGES") {
        config.sandbox.pull_images = pull == "true" || pull == "1";
    }
    for sandbox_type in SandboxType::ALL {
        let key = format!("SANDPOOL_IMAGE_{}", sandbox_type.as_str().to_uppercase());
        if let Some(image) = lookup(&key) {
            config.sandbox.images.insert(sandbox_type, image);
        }
    }

    // Bridge overrides
    if let Some(secs) = lookup("SANDPOOL_REQUEST_TIMEOUT_SECS") {
        config.bridge.request_timeout =
            std::time::Duration::from_secs(parse_var("SANDPOOL_REQUEST_TIMEOUT_SECS", &secs)?);
    }
    if let Some(secs) = lookup("SANDPOOL_READY_TIMEOUT_SECS") {
        config.bridge.readiness.timeout =
            std::time::Duration::from_secs(parse_var("SANDPOOL_READY_TIMEOUT_SECS", &secs)?);
    }

    Ok(())
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

/// Read a configuration file into a snapshot
pub fn read_config_snapshot(path: &Path) -> ConfigSnapshot {
    if !path.exists() {
        return ConfigSnapshot {
            path: path.to_path_buf(),
            exists: false,
            config: None,
            issues: vec!["Configuration file does not exist".to_string()],
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigSnapshot {
            path: path.to_path_buf(),
            exists: true,
            config: Some(config),
            issues: Vec::new(),
        },
        Err(e) => ConfigSnapshot {
            path: path.to_path_buf(),
            exists: true,
            config: None,
            issues: vec![e.to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::RuntimeProfile;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        for name in ["config.toml", "config.json"] {
            let path = dir.path().join(name);

            let mut config = Config::default();
            config.sandbox.port_range_start = 9100;
            config
                .sandbox
                .images
                .insert(SandboxType::Java, "eclipse-temurin:21".to_string());
            save_config(&config, &path).unwrap();

            let loaded = load_config_from_path(&path).unwrap();
            assert_eq!(loaded.sandbox.port_range_start, 9100);
            assert_eq!(loaded.sandbox.image_for(SandboxType::Java), "eclipse-temurin:21");
            assert_eq!(loaded.bridge.request_timeout, config.bridge.request_timeout);
        }
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            ("SANDPOOL_PORT_START", "12000"),
            ("SANDPOOL_RUNTIME", "gvisor"),
            ("SANDPOOL_IMAGE_NODE", "node:22-slim"),
            ("SANDPOOL_REQUEST_TIMEOUT_SECS", "5"),
        ]);
        let mut config = Config::default();
        apply_overrides_from(&mut config, |k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.sandbox.port_range_start, 12000);
        assert_eq!(config.sandbox.runtime, RuntimeProfile::Gvisor);
        assert_eq!(config.sandbox.image_for(SandboxType::Node), "node:22-slim");
        assert_eq!(config.bridge.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_env_override_is_config_error() {
        let mut config = Config::default();
        let err = apply_overrides_from(&mut config, |k| {
            (k == "SANDPOOL_PORT_START").then(|| "eighty".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_snapshot_of_missing_and_broken_files() {
        let dir = tempdir().unwrap();
        let missing = read_config_snapshot(&dir.path().join("nope.toml"));
        assert!(!missing.exists);

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "sandbox = [").unwrap();
        let snapshot = read_config_snapshot(&broken);
        assert!(snapshot.exists);
        assert!(snapshot.config.is_none());
        assert_eq!(snapshot.issues.len(), 1);
    }
}
