//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EUDORA2TBIRD_CONFIG` (environment variable)
//! 2. `~/.config/eudora2tbird/config.toml` (Linux/macOS)
//!    `%APPDATA%\eudora2tbird\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::repair::{RepairOptions, DEFAULT_FAILED_FROM};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub general: GeneralConfig,
    /// Default Eudora directories.
    pub paths: PathsConfig,
    /// Repair behavior.
    pub repair: RepairConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override the directory holding `eudora2tbird.log`.
    pub log_dir: Option<PathBuf>,
}

/// Directories used when `--attach` / `--embed` are not given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub attach_dir: Option<PathBuf>,
    pub embed_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Replaces a `From` header that cannot be sanitized.
    pub failed_from_address: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            failed_from_address: DEFAULT_FAILED_FROM.to_string(),
        }
    }
}

impl Config {
    /// Repair options from this config, with the command-line directories
    /// taking precedence.
    pub fn repair_options(
        &self,
        attach_dir: Option<PathBuf>,
        embed_dir: Option<PathBuf>,
    ) -> RepairOptions {
        RepairOptions {
            attach_dir: attach_dir.or_else(|| self.paths.attach_dir.clone()),
            embed_dir: embed_dir.or_else(|| self.paths.embed_dir.clone()),
            failed_from_address: self.repair.failed_from_address.clone(),
        }
    }
}

/// Load configuration from the standard location.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from `path`, falling back to defaults on any error.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EUDORA2TBIRD_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("eudora2tbird").join("config.toml"))
}

/// Directory holding `eudora2tbird.log`.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eudora2tbird")
}
