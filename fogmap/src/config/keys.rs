//! Addressable configuration keys for get/set from the command line.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{
    parse_accuracy, parse_bool, parse_level, parse_radius, ConfigError, ConfigFile, ConfigResult,
};

/// A single `section.key` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    MapExplorationRadius,
    MapAutoMapCentering,
    MapMaxFixAccuracy,
    StorageDatabase,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::MapExplorationRadius,
            ConfigKey::MapAutoMapCentering,
            ConfigKey::MapMaxFixAccuracy,
            ConfigKey::StorageDatabase,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::MapExplorationRadius
            | ConfigKey::MapAutoMapCentering
            | ConfigKey::MapMaxFixAccuracy => "map",
            ConfigKey::StorageDatabase => "storage",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::MapExplorationRadius => "exploration_radius",
            ConfigKey::MapAutoMapCentering => "auto_map_centering",
            ConfigKey::MapMaxFixAccuracy => "max_fix_accuracy",
            ConfigKey::StorageDatabase => "database",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Full dotted name, e.g. `map.exploration_radius`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::MapExplorationRadius => config.map.exploration_radius.to_string(),
            ConfigKey::MapAutoMapCentering => config.map.auto_map_centering.to_string(),
            ConfigKey::MapMaxFixAccuracy => config.map.max_fix_accuracy_m.to_string(),
            ConfigKey::StorageDatabase => config.storage.database.display().to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate and store a value. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> ConfigResult<()> {
        let (section, key) = (self.section(), self.key_name());
        match self {
            ConfigKey::MapExplorationRadius => {
                config.map.exploration_radius = parse_radius(section, key, value)?;
            }
            ConfigKey::MapAutoMapCentering => {
                config.map.auto_map_centering = parse_bool(section, key, value)?;
            }
            ConfigKey::MapMaxFixAccuracy => {
                config.map.max_fix_accuracy_m = parse_accuracy(section, key, value)?;
            }
            ConfigKey::StorageDatabase => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        section: section.to_string(),
                        key: key.to_string(),
                        value: value.to_string(),
                        reason: "path must not be empty".to_string(),
                    });
                }
                config.storage.database = PathBuf::from(trimmed);
            }
            ConfigKey::LoggingLevel => {
                config.logging.level = parse_level(section, key, value)?;
            }
            ConfigKey::LoggingDirectory => {
                let trimmed = value.trim();
                config.logging.directory = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
