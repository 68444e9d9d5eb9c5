//! INI configuration file.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::settings::MapSettings;
use crate::logging::LoggingConfig;

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {section}.{key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// SQLite database holding visited regions.
    pub database: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

/// Parsed contents of `config.ini`. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub map: MapSettings,
    pub storage: StorageSettings,
    pub logging: LoggingConfig,
}

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fogmap")
        .join("config.ini")
}

/// Default location of the region database.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fogmap")
        .join("regions.db")
}

pub(super) fn parse_bool(section: &str, key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "expected true or false")),
    }
}

pub(super) fn parse_radius(section: &str, key: &str, value: &str) -> ConfigResult<u32> {
    match value.trim().parse::<u32>() {
        Ok(0) => Err(invalid(section, key, value, "must be greater than zero")),
        Ok(v) => Ok(v),
        Err(e) => Err(invalid(section, key, value, &e.to_string())),
    }
}

pub(super) fn parse_accuracy(section: &str, key: &str, value: &str) -> ConfigResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        Ok(_) => Err(invalid(section, key, value, "must be a positive number")),
        Err(e) => Err(invalid(section, key, value, &e.to_string())),
    }
}

pub(super) fn parse_level(section: &str, key: &str, value: &str) -> ConfigResult<String> {
    let level = value.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(level),
        _ => Err(invalid(
            section,
            key,
            value,
            "expected trace, debug, info, warn, error or off",
        )),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl ConfigFile {
    /// Load from the default path, or defaults if the file does not exist.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path, or defaults if the file does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Save to the default path.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    fn from_ini(ini: &Ini) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(map) = ini.section(Some("map")) {
            if let Some(v) = map.get("exploration_radius") {
                config.map.exploration_radius = parse_radius("map", "exploration_radius", v)?;
            }
            if let Some(v) = map.get("auto_map_centering") {
                config.map.auto_map_centering = parse_bool("map", "auto_map_centering", v)?;
            }
            if let Some(v) = map.get("max_fix_accuracy") {
                config.map.max_fix_accuracy_m = parse_accuracy("map", "max_fix_accuracy", v)?;
            }
        }

        if let Some(storage) = ini.section(Some("storage")) {
            if let Some(v) = storage.get("database").and_then(non_empty) {
                config.storage.database = PathBuf::from(v);
            }
        }

        if let Some(logging) = ini.section(Some("logging")) {
            if let Some(v) = logging.get("level").and_then(non_empty) {
                config.logging.level = parse_level("logging", "level", v)?;
            }
            config.logging.directory = logging
                .get("directory")
                .and_then(non_empty)
                .map(PathBuf::from);
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("map"))
            .set("exploration_radius", self.map.exploration_radius.to_string())
            .set("auto_map_centering", self.map.auto_map_centering.to_string())
            .set("max_fix_accuracy", self.map.max_fix_accuracy_m.to_string());
        ini.with_section(Some("storage"))
            .set("database", self.storage.database.display().to_string());
        ini.with_section(Some("logging"))
            .set("level", self.logging.level.clone())
            .set(
                "directory",
                self.logging
                    .directory
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
            );
        ini
    }
}
