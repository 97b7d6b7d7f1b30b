//! Engine configuration.
//!
//! Layered the same way as the rest of this codebase's tooling: a
//! [`Settings`] struct with serde defaults, a schema describing the valid
//! option space, and a manager that persists a versioned JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Per-transition-type parameter overrides.
///
/// `curve` is a curve name ("linear", "sine", "exponential", "logarithmic");
/// unknown names fall back to the engine default, matching the crossfade
/// engine's lenient parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
}

impl StyleOverride {
    pub fn is_empty(&self) -> bool {
        self.duration_seconds.is_none() && self.overlap_seconds.is_none() && self.curve.is_none()
    }
}

/// Overrides for each transition type's base parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleOverrides {
    #[serde(default, skip_serializing_if = "StyleOverride::is_empty")]
    pub quick_cut: StyleOverride,
    #[serde(default, skip_serializing_if = "StyleOverride::is_empty")]
    pub harmonic: StyleOverride,
    #[serde(default, skip_serializing_if = "StyleOverride::is_empty")]
    pub echo_out: StyleOverride,
}

/// Persisted engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Deck sync monitor poll interval in milliseconds.
    pub sync_poll_interval_ms: u64,
    /// How many tracks a smart-fill pass tries to append.
    pub smart_fill_target: usize,
    /// Whether transitions start automatically at the planned exit point.
    pub auto_transitions: bool,
    /// Transition style overrides.
    pub style: StyleOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync_poll_interval_ms: 50,
            smart_fill_target: 5,
            auto_transitions: true,
            style: StyleOverrides::default(),
        }
    }
}

/// Configuration option with validation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub description: String,
}

/// Available configuration options with validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub sync_poll_interval_ms: ConfigOption<u64>,
    pub smart_fill_target: ConfigOption<usize>,
    pub auto_transitions: ConfigOption<bool>,
}

/// Persisted configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

/// Loads and saves [`Settings`] as JSON.
///
/// Defaults to `config.json` in the current working directory when no
/// path is given.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("config.json"));
        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from the configuration file, creating it with
    /// defaults when it does not exist yet.
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "config file version {} doesn't match application version {}; using defaults for new settings",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to the configuration file.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            modified_at: chrono::Utc::now().to_rfc3339(),
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Update settings and save to file.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the configuration schema with available options.
    pub fn schema() -> ConfigSchema {
        ConfigSchema {
            sync_poll_interval_ms: ConfigOption {
                default: 50,
                valid_range: Some((10, 1000)),
                description: "Deck sync monitor poll interval in milliseconds".to_string(),
            },
            smart_fill_target: ConfigOption {
                default: 5,
                valid_range: Some((1, 50)),
                description: "Number of tracks smart-fill tries to append".to_string(),
            },
            auto_transitions: ConfigOption {
                default: true,
                valid_range: None,
                description: "Start transitions automatically at the planned exit point"
                    .to_string(),
            },
        }
    }

    /// Validate settings against the schema.
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        if let Some((min, max)) = schema.sync_poll_interval_ms.valid_range {
            if settings.sync_poll_interval_ms < min || settings.sync_poll_interval_ms > max {
                errors.push(format!(
                    "sync_poll_interval_ms must be between {} and {}",
                    min, max
                ));
            }
        }

        if let Some((min, max)) = schema.smart_fill_target.valid_range {
            if settings.smart_fill_target < min || settings.smart_fill_target > max {
                errors.push(format!(
                    "smart_fill_target must be between {} and {}",
                    min, max
                ));
            }
        }

        for (name, style) in [
            ("quick_cut", &settings.style.quick_cut),
            ("harmonic", &settings.style.harmonic),
            ("echo_out", &settings.style.echo_out),
        ] {
            if let Some(duration) = style.duration_seconds {
                if duration <= 0.0 {
                    errors.push(format!("style.{}.duration_seconds must be positive", name));
                }
            }
            if let Some(overlap) = style.overlap_seconds {
                if overlap < 0.0 {
                    errors.push(format!("style.{}.overlap_seconds must not be negative", name));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset settings to defaults.
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }
}

/// Configuration error types.
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String),
    WriteError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Failed to write config file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config file: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Failed to serialize config: {}", msg),
            ConfigError::ValidationError(errors) => {
                write!(f, "Config validation errors: {}", errors.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_config_manager_new() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let manager = ConfigManager::new(Some(config_path.clone()));
        assert_eq!(manager.config_path(), config_path);
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));

        let mut settings = Settings::default();
        settings.sync_poll_interval_ms = 100;
        settings.smart_fill_target = 10;
        settings.style.harmonic.duration_seconds = Some(24.0);

        manager.update_settings(settings.clone()).unwrap();

        let mut manager2 = ConfigManager::new(Some(config_path));
        let loaded = manager2.load().unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.sync_poll_interval_ms = 5; // Below valid range
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.sync_poll_interval_ms = 50;
        settings.style.echo_out.duration_seconds = Some(-1.0);
        assert!(ConfigManager::validate_settings(&settings).is_err());
    }

    #[test]
    fn update_rejects_invalid_settings_without_saving() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let mut manager = ConfigManager::new(Some(config_path.clone()));

        let mut bad = Settings::default();
        bad.smart_fill_target = 0;
        assert!(manager.update_settings(bad).is_err());
        assert!(!config_path.exists());
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn missing_file_loads_defaults_and_creates_it() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let mut manager = ConfigManager::new(Some(config_path.clone()));

        let loaded = manager.load().unwrap();
        assert_eq!(loaded, Settings::default());
        assert!(config_path.exists());
    }
}
