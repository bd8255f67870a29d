//! Configuration loading, validation, and management for Arbor.
//!
//! Loads configuration from `~/.arbor/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.arbor/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Confidence recorded for fragments that carry none
    #[serde(default = "default_confidence")]
    pub default_confidence: f64,

    /// Which client's fragments and diagrams to operate on
    #[serde(default)]
    pub scope: ScopeConfig,

    /// Recency windows and thresholds bounding each run
    #[serde(default)]
    pub windows: WindowConfig,

    /// Backing store
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_confidence() -> f64 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default = "default_client_id")]
    pub client_id: i64,
}

fn default_client_id() -> i64 {
    6
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// How far back fragment and diagram queries look
    #[serde(default = "default_recency_days")]
    pub recency_days: u32,

    /// Max unassigned fragments per run
    #[serde(default = "default_unassigned_limit")]
    pub unassigned_limit: usize,

    /// Max partially-assigned fragments per run
    #[serde(default = "default_partial_limit")]
    pub partial_limit: usize,

    /// Max diagrams scanned by the relationship detector
    #[serde(default = "default_recent_diagram_limit")]
    pub recent_diagram_limit: usize,

    /// How old an open diagram may be and still be extended by the
    /// secondary pass instead of starting a new one
    #[serde(default = "default_extend_window_hours")]
    pub extend_window_hours: u32,

    /// Assignments below this confidence stay eligible for more diagrams
    #[serde(default = "default_partial_confidence_threshold")]
    pub partial_confidence_threshold: f64,
}

fn default_recency_days() -> u32 {
    7
}
fn default_unassigned_limit() -> usize {
    100
}
fn default_partial_limit() -> usize {
    50
}
fn default_recent_diagram_limit() -> usize {
    10
}
fn default_extend_window_hours() -> u32 {
    24
}
fn default_partial_confidence_threshold() -> f64 {
    0.9
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            recency_days: default_recency_days(),
            unassigned_limit: default_unassigned_limit(),
            partial_limit: default_partial_limit(),
            recent_diagram_limit: default_recent_diagram_limit(),
            extend_window_hours: default_extend_window_hours(),
            partial_confidence_threshold: default_partial_confidence_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// SQLite database path; defaults to `~/.arbor/arbor.sqlite`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_store_backend() -> String {
    "sqlite".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl StoreConfig {
    /// The database path, falling back to the config directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("arbor.sqlite"))
    }
}

const KNOWN_BACKENDS: &[&str] = &["sqlite", "memory"];

/// Upper bound for `windows.recency_days` (ten years)
pub const MAX_RECENCY_DAYS: u32 = 3650;

/// Upper bound for `windows.extend_window_hours` (one year)
pub const MAX_EXTEND_WINDOW_HOURS: u32 = 24 * 365;

impl AppConfig {
    /// Load configuration from the default path (~/.arbor/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `ARBOR_DATABASE`: store path
    /// - `ARBOR_STORE`: store backend
    /// - `ARBOR_CLIENT_ID`: client scope
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = lookup("ARBOR_DATABASE") {
            self.store.path = Some(path);
        }

        if let Some(backend) = lookup("ARBOR_STORE") {
            self.store.backend = backend;
        }

        if let Some(client_id) = lookup("ARBOR_CLIENT_ID") {
            self.scope.client_id = client_id.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("ARBOR_CLIENT_ID is not an integer: {client_id}"))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".arbor")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(ConfigError::ValidationError(
                "default_confidence must be between 0.0 and 1.0".into(),
            ));
        }

        let w = &self.windows;
        if !(0.0..=1.0).contains(&w.partial_confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "windows.partial_confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if w.recency_days == 0 || w.extend_window_hours == 0 {
            return Err(ConfigError::ValidationError(
                "windows.recency_days and windows.extend_window_hours must be > 0".into(),
            ));
        }

        if w.recency_days > MAX_RECENCY_DAYS {
            return Err(ConfigError::ValidationError(format!(
                "windows.recency_days must be at most {MAX_RECENCY_DAYS} (got {})",
                w.recency_days
            )));
        }

        if w.extend_window_hours > MAX_EXTEND_WINDOW_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "windows.extend_window_hours must be at most {MAX_EXTEND_WINDOW_HOURS} (got {})",
                w.extend_window_hours
            )));
        }

        if w.unassigned_limit == 0 || w.partial_limit == 0 || w.recent_diagram_limit == 0 {
            return Err(ConfigError::ValidationError("window limits must be > 0".into()));
        }

        if !KNOWN_BACKENDS.contains(&self.store.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown store backend '{}' (expected one of: {})",
                self.store.backend,
                KNOWN_BACKENDS.join(", ")
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_confidence: default_confidence(),
            scope: ScopeConfig::default(),
            windows: WindowConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scope.client_id, 6);
        assert_eq!(config.windows.recency_days, 7);
        assert_eq!(config.windows.unassigned_limit, 100);
        assert_eq!(config.windows.recent_diagram_limit, 10);
        assert_eq!(config.windows.extend_window_hours, 24);
        assert_eq!(config.windows.partial_confidence_threshold, 0.9);
        assert_eq!(config.default_confidence, 0.7);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.store.backend, config.store.backend);
        assert_eq!(parsed.windows.partial_limit, config.windows.partial_limit);
    }

    #[test]
    fn invalid_threshold_rejected() {
        let mut config = AppConfig::default();
        config.windows.partial_confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = "postgres".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("postgres"));
    }

    #[test]
    fn oversized_windows_rejected() {
        let mut config = AppConfig::default();
        config.windows.recency_days = 200_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("recency_days"));

        let mut config = AppConfig::default();
        config.windows.extend_window_hours = MAX_EXTEND_WINDOW_HOURS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("extend_window_hours"));

        let mut config = AppConfig::default();
        config.windows.recency_days = MAX_RECENCY_DAYS;
        config.windows.extend_window_hours = MAX_EXTEND_WINDOW_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn oversized_recency_in_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[windows]\nrecency_days = 200000000").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.store.backend, "sqlite");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[windows]
extend_window_hours = 6

[store]
backend = "memory"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.windows.extend_window_hours, 6);
        assert_eq!(config.windows.recency_days, 7);
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.scope.client_id, 6);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "windows = [not toml").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ARBOR_DATABASE", "/tmp/arbor-test.sqlite"),
            ("ARBOR_CLIENT_ID", "42"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.scope.client_id, 42);
        assert_eq!(config.store.resolved_path(), PathBuf::from("/tmp/arbor-test.sqlite"));
    }

    #[test]
    fn non_numeric_client_id_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|k| (k == "ARBOR_CLIENT_ID").then(|| "six".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("six"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("sqlite"));
        assert!(toml_str.contains("extend_window_hours"));
    }
}
