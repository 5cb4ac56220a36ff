//! Configuration file handling for the Jigsaw CLI
//!
//! Manages configuration stored in `~/.config/jigsaw/config.toml` (or platform equivalent).
//!
//! ## Configuration Layers
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Hard-coded defaults
//! 2. Config file (`~/.config/jigsaw/config.toml`)
//! 3. Command-line arguments
//!
//! ## Example Config File
//!
//! ```toml
//! version = 1
//!
//! [storage]
//! backend = "file"
//! key = "user_limits"
//!
//! [output]
//! default_format = "human"
//! color = true
//!
//! [logging]
//! level = "warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::storage::file::default_data_dir;
use crate::storage::{is_valid_key, StorageBackend};
use crate::tracker::LIMITS_KEY;

// Bump when making breaking changes to the file layout
const CONFIG_VERSION: u32 = 1;
const LEGACY_CONFIG_VERSION: u32 = 0;

// =============================================================================
// Configuration Structures
// =============================================================================

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JigsawConfig {
    /// Config file format version for migrations
    #[serde(default = "default_config_version")]
    pub version: u32,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_config_version() -> u32 {
    LEGACY_CONFIG_VERSION
}

/// Where the entitlement record lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "file" (durable) or "memory" (lost on exit)
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Data directory for the file backend (None = platform data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Key the record is stored under
    #[serde(default = "default_key")]
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format (human, json)
    #[serde(default = "default_format")]
    pub default_format: String,

    /// Use colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when --verbose is not given
    #[serde(default = "default_log_level")]
    pub level: String,
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn default_backend() -> String {
    "file".to_string()
}

fn default_key() -> String {
    LIMITS_KEY.to_string()
}

fn default_format() -> String {
    "human".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "error".to_string()
}

fn normalize_backend(value: &str) -> String {
    match value.parse::<StorageBackend>() {
        Ok(backend) => backend.to_string(),
        Err(_) => value.trim().to_lowercase(),
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

// =============================================================================
// Default Implementations
// =============================================================================

impl Default for JigsawConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: StorageConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: None,
            key: default_key(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl StorageConfig {
    /// Parsed backend; unknown values fall back to the file backend
    pub fn backend(&self) -> StorageBackend {
        self.backend.parse().unwrap_or_else(|e| {
            tracing::warn!("{}; using file storage", e);
            StorageBackend::File
        })
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

// =============================================================================
// Configuration Loading and Saving
// =============================================================================

impl JigsawConfig {
    /// Get the default configuration file path
    ///
    /// - Linux: `~/.config/jigsaw/config.toml`
    /// - macOS: `~/Library/Application Support/jigsaw/config.toml`
    /// - Windows: `%APPDATA%\jigsaw\config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jigsaw")
            .join("config.toml")
    }

    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    ///
    /// Returns defaults if the file doesn't exist or can't be parsed.
    /// Migrated or normalized configs are written back.
    pub fn load_from(path: PathBuf) -> Self {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                tracing::debug!("Config file not found at {:?}, using defaults", path);
                return Self::default();
            }
        };

        let mut config = match toml::from_str::<Self>(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                return Self::default();
            }
        };
        tracing::debug!("Loaded config from {:?}", path);

        let original_version = config.version;
        config.migrate_if_needed();

        let mut changed = false;
        let normalized = normalize_backend(&config.storage.backend);
        if normalized != config.storage.backend {
            config.storage.backend = normalized;
            changed = true;
        }
        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            tracing::warn!(
                "Unknown log level '{}' in config, using default",
                config.logging.level
            );
            config.logging.level = default_log_level();
            changed = true;
        }

        if config.version != original_version || changed {
            tracing::info!(
                "Config migrated from version {} to {}",
                original_version,
                config.version
            );
            if let Err(e) = config.save_to(path.clone()) {
                tracing::warn!("Failed to persist migrated config {:?}: {}", path, e);
            }
        }
        config
    }

    fn migrate_if_needed(&mut self) {
        match self.version {
            0 => {
                // v0 files had no [storage] key and stored the record under the
                // client's key, which is also today's default
                if self.storage.key.trim().is_empty() {
                    self.storage.key = default_key();
                }
                self.version = CONFIG_VERSION;
            }
            CONFIG_VERSION => {}
            _ => {
                tracing::warn!(
                    "Config version {} is newer than supported version {}",
                    self.version,
                    CONFIG_VERSION
                );
            }
        }
    }

    /// Save configuration to a specific path, creating parent directories
    pub fn save_to(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(&path, content)?;
        tracing::debug!("Saved config to {:?}", path);

        Ok(())
    }

    /// Get a configuration value by dotted key path: `storage.backend`
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["storage", "backend"] => Some(self.storage.backend.clone()),
            ["storage", "data_dir"] => Some(
                self.storage
                    .data_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            ["storage", "key"] => Some(self.storage.key.clone()),
            ["output", "default_format"] => Some(self.output.default_format.clone()),
            ["output", "color"] => Some(self.output.color.to_string()),
            ["logging", "level"] => Some(self.logging.level.clone()),
            _ => None,
        }
    }

    /// Set a configuration value by dotted key path
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = key.split('.').collect();
        let invalid = |expected: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        };

        match parts.as_slice() {
            ["storage", "backend"] => {
                let backend: StorageBackend = value
                    .parse()
                    .map_err(|_| invalid("file/disk/local or memory/ephemeral"))?;
                self.storage.backend = backend.to_string();
            }
            ["storage", "data_dir"] => {
                let trimmed = value.trim();
                self.storage.data_dir = if trimmed.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(trimmed))
                };
            }
            ["storage", "key"] => {
                if !is_valid_key(value) {
                    return Err(invalid("letters, digits, '-', '_' or '.'"));
                }
                self.storage.key = value.to_string();
            }
            ["output", "default_format"] => {
                if !["human", "json"].contains(&value) {
                    return Err(invalid("human or json"));
                }
                self.output.default_format = value.to_string();
            }
            ["output", "color"] => {
                self.output.color = value.parse().map_err(|_| invalid("true or false"))?;
            }
            ["logging", "level"] => {
                if !LOG_LEVELS.contains(&value) {
                    return Err(invalid("off, error, warn, info, debug or trace"));
                }
                self.logging.level = value.to_string();
            }
            _ => {
                return Err(ConfigError::UnknownKey(key.to_string()));
            }
        }

        Ok(())
    }

    /// List all configuration keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        [
            "storage.backend",
            "storage.data_dir",
            "storage.key",
            "output.default_format",
            "output.color",
            "logging.level",
        ]
        .into_iter()
        .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
        .collect()
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: '{value}' (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = JigsawConfig::default();
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.storage.key, "user_limits");
        assert_eq!(config.storage.backend(), StorageBackend::File);
        assert!(config.output.color);
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    fn test_config_path() {
        let path = JigsawConfig::default_path();
        assert!(path.to_string_lossy().contains("jigsaw"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = JigsawConfig::default();
        config.storage.backend = "memory".to_string();
        config.storage.data_dir = Some(temp_dir.path().join("data"));
        config.output.color = false;

        config.save_to(config_path.clone()).unwrap();

        let loaded = JigsawConfig::load_from(config_path);
        assert_eq!(loaded.storage.backend(), StorageBackend::Memory);
        assert_eq!(
            loaded.storage.resolved_data_dir(),
            temp_dir.path().join("data")
        );
        assert!(!loaded.output.color);
    }

    #[test]
    fn test_load_nonexistent() {
        let config = JigsawConfig::load_from(PathBuf::from("/nonexistent/config.toml"));
        assert_eq!(config.storage.key, "user_limits");
    }

    #[test]
    fn test_load_garbage_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "storage = [[[").unwrap();

        let config = JigsawConfig::load_from(config_path);
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.storage.backend, "file");
    }

    #[test]
    fn test_get() {
        let config = JigsawConfig::default();
        assert_eq!(config.get("storage.backend"), Some("file".to_string()));
        assert_eq!(config.get("storage.data_dir"), Some(String::new()));
        assert_eq!(config.get("output.color"), Some("true".to_string()));
        assert_eq!(config.get("invalid.key"), None);
    }

    #[test]
    fn test_set() {
        let mut config = JigsawConfig::default();

        config.set("storage.backend", "ephemeral").unwrap();
        assert_eq!(config.storage.backend, "memory");

        config.set("storage.data_dir", "/tmp/jigsaw").unwrap();
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/jigsaw")));
        config.set("storage.data_dir", "").unwrap();
        assert!(config.storage.data_dir.is_none());

        config.set("output.default_format", "json").unwrap();
        assert_eq!(config.output.default_format, "json");

        config.set("logging.level", "debug").unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_set_invalid_value() {
        let mut config = JigsawConfig::default();

        assert!(config.set("storage.backend", "cloud").is_err());
        assert!(config.set("storage.key", "../escape").is_err());
        assert!(config.set("output.default_format", "csv").is_err());
        assert!(config.set("output.color", "maybe").is_err());
        assert!(config.set("logging.level", "loud").is_err());
    }

    #[test]
    fn test_set_unknown_key() {
        let mut config = JigsawConfig::default();
        let result = config.set("unknown.key", "value");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn test_list() {
        let config = JigsawConfig::default();
        let items = config.list();
        assert_eq!(items.len(), 6);
        assert!(items.iter().any(|(k, v)| k == "storage.key" && v == "user_limits"));
    }

    #[test]
    fn test_toml_serialization() {
        let config = JigsawConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[storage]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_unversioned_config_migrates_and_normalizes() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("legacy.toml");
        let legacy = r#"
[storage]
backend = "Disk"
key = ""

[logging]
level = "chatty"
"#;
        std::fs::write(&config_path, legacy).unwrap();

        let loaded = JigsawConfig::load_from(config_path.clone());
        assert_eq!(loaded.version, CONFIG_VERSION);
        assert_eq!(loaded.storage.backend, "file");
        assert_eq!(loaded.storage.key, "user_limits");
        assert_eq!(loaded.logging.level, "error");

        let rewritten = std::fs::read_to_string(config_path).unwrap();
        assert!(rewritten.contains("version = 1"));
    }

    #[test]
    fn test_unknown_backend_is_preserved_but_resolves_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("unknown-backend.toml");
        std::fs::write(&config_path, "version = 1\n[storage]\nbackend = \"s3\"\n").unwrap();

        let loaded = JigsawConfig::load_from(config_path);
        assert_eq!(loaded.storage.backend, "s3");
        assert_eq!(loaded.storage.backend(), StorageBackend::File);
    }
}
