//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use fogmap::config::{config_file_path, ConfigFile};
use fogmap::store::SqliteRegionStore;

use crate::error::CliError;

/// Resolved configuration for a single invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: PathBuf,
    pub config: ConfigFile,
}

impl Context {
    /// Load configuration, honoring `--config` and `--database`.
    pub fn load(
        config_override: Option<PathBuf>,
        database_override: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let config_path = config_override.unwrap_or_else(config_file_path);
        let mut config = ConfigFile::load_from(&config_path)?;
        if let Some(database) = database_override {
            config.storage.database = database;
        }
        Ok(Self {
            config_path,
            config,
        })
    }

    /// Open the configured region database.
    pub fn open_store(&self) -> Result<Arc<SqliteRegionStore>, CliError> {
        let store = SqliteRegionStore::try_open(&self.config.storage.database)?;
        Ok(Arc::new(store))
    }
}

/// Format a coordinate pair for display.
pub fn format_coord(lat: f64, lon: f64) -> String {
    format!("{:.5}, {:.5}", lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_database_override() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::load(
            Some(dir.path().join("config.ini")),
            Some(dir.path().join("other.db")),
        )
        .unwrap();
        assert_eq!(ctx.config.storage.database, dir.path().join("other.db"));
        assert!(ctx.open_store().unwrap().is_available());
    }

    #[test]
    fn test_format_coord() {
        assert_eq!(format_coord(41.0082, 28.9784), "41.00820, 28.97840");
    }
}
