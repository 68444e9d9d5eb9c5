//! Configuration
//!
//! Settings live in an INI file at `<config_dir>/fogmap/config.ini`:
//!
//! ```ini
//! [map]
//! exploration_radius = 200
//! auto_map_centering = true
//! max_fix_accuracy = 65
//!
//! [storage]
//! database = /home/user/.local/share/fogmap/regions.db
//!
//! [logging]
//! level = info
//! directory =
//! ```
//!
//! Missing keys fall back to defaults. [`ConfigKey`] addresses individual
//! settings for the `config get|set` commands, and [`SharedSettings`] holds
//! the map settings a running session reads on every fix.

mod file;
mod keys;
mod settings;

pub use file::{
    config_file_path, default_database_path, ConfigError, ConfigFile, ConfigResult,
    StorageSettings,
};
pub use keys::ConfigKey;
pub use settings::{MapSettings, SharedSettings};
