//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path` commands
//! for viewing and modifying configuration settings from the command line.

use clap::Subcommand;
use console::style;
use fogmap::config::ConfigKey;

use super::common::Context;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., map.exploration_radius)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., map.exploration_radius)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, ctx: Context) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key, &ctx),
        ConfigCommands::Set { key, value } => run_set(&key, &value, ctx),
        ConfigCommands::List => run_list(&ctx),
        ConfigCommands::Path => run_path(&ctx),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'fogmap config list' to see available keys.",
            key
        ))
    })
}

/// Get a configuration value.
fn run_get(key: &str, ctx: &Context) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let value = config_key.get(&ctx.config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

/// Set a configuration value.
fn run_set(key: &str, value: &str, mut ctx: Context) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    config_key.set(&mut ctx.config, value)?;
    ctx.config.save_to(&ctx.config_path)?;

    println!("Set {} = {}", style(config_key.name()).bold(), value);

    Ok(())
}

/// List all configuration settings.
fn run_list(ctx: &Context) -> Result<(), CliError> {
    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("{}", style(format!("[{}]", section)).cyan());
            current_section = section;
        }

        let value = key.get(&ctx.config);
        let key_name = key.key_name();

        if value.is_empty() {
            println!("  {} = (not set)", key_name);
        } else {
            println!("  {} = {}", key_name, value);
        }
    }

    Ok(())
}

/// Show the configuration file path.
fn run_path(ctx: &Context) -> Result<(), CliError> {
    println!("{}", ctx.config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogmap::config::ConfigFile;
    use tempfile::TempDir;

    #[test]
    fn test_set_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        let ctx = Context::load(Some(path.clone()), None).unwrap();

        run_set("map.exploration_radius", "250", ctx).unwrap();

        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded.map.exploration_radius, 250);
    }

    #[test]
    fn test_unknown_key() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::load(Some(dir.path().join("config.ini")), None).unwrap();
        assert!(matches!(run_get("map.colour", &ctx), Err(CliError::Config(_))));
    }
}
