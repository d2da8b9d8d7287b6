//! Configuration CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::Path;

use super::output::{print_output, OutputFormat};
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Load and validate the configuration file
    Validate,

    /// Show the effective configuration (secrets redacted)
    Show {
        /// Output format (json or yaml)
        #[arg(short, long, default_value = "yaml")]
        output: OutputFormat,
    },
}

/// Handle config commands
pub fn handle_config_command(command: ConfigCommands, path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(path).context("Configuration is invalid")?;

    match command {
        ConfigCommands::Validate => {
            println!(
                "Configuration is valid: ca={}, storage={}, roles from {} ({} configured)",
                config.ca.backend,
                config.storage.backend,
                config.role_source,
                config.roles.len()
            );
        }
        ConfigCommands::Show { output } => print_output(&config, output)?,
    }

    Ok(())
}
