//! # Command Line Interface
//!
//! `issue` runs one enrollment against the configured CA, `revoke` is
//! accepted and ignored, and `config` inspects the configuration file.

pub mod config_cmd;
pub mod output;

use crate::ca::CaBackendType;
use crate::config::AppConfig;
use crate::enroll::CertificateIssuer;
use crate::observability::{init_observability, log_config_info};
use crate::pki::parse_alt_names;
use crate::storage::StorageBackendType;
use crate::vault;
use anyhow::Context;
use clap::{Parser, Subcommand};
use output::{print_output, OutputFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "certwarden")]
#[command(about = "X.509 certificate enrollment against an external CA")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Issue a certificate for a role
    Issue {
        /// Role whose policy governs the key and storage
        #[arg(short, long)]
        role: String,

        /// Certificate common name; defaults to the first alt name
        #[arg(long, default_value = "")]
        common_name: String,

        /// Comma-separated DNS subject alternative names
        #[arg(long, default_value = "")]
        alt_names: String,

        /// Output format (json or yaml)
        #[arg(short, long, default_value = "json")]
        output: OutputFormat,
    },

    /// Revoke a certificate (accepted, currently has no effect)
    Revoke {
        #[arg(short, long)]
        role: String,

        /// Identifier of the certificate to revoke
        #[arg(long)]
        certificate_uid: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommands,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { command } = cli.command {
        return config_cmd::handle_config_command(command, cli.config.as_deref());
    }

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_observability(&config.observability)?;
    log_config_info(&config);

    match cli.command {
        Commands::Issue { role, common_name, alt_names, output } => {
            let issuer = CertificateIssuer::from_config(&config)?;
            check_vault_backends(&config).await?;
            let alt_names = parse_alt_names(&alt_names);
            let response = issuer.issue(&role, &common_name, &alt_names).await?;
            print_output(&response, output)?;
        }
        Commands::Revoke { role, certificate_uid } => {
            let issuer = CertificateIssuer::from_config(&config)?;
            issuer.revoke(&role, &certificate_uid).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Check that every configured Vault answers its health endpoint.
async fn check_vault_backends(config: &AppConfig) -> anyhow::Result<()> {
    if config.storage.backend == StorageBackendType::VaultKv {
        if let Some(address) = config.storage.address.as_deref() {
            let client = vault::build_client(address, config.storage.token.as_ref())?;
            vault::check_health(&client, address).await?;
        }
    }
    if config.ca.backend == CaBackendType::VaultPki {
        if let Some(address) = config.ca.url.as_deref() {
            let client = vault::build_client(address, config.ca.access_token.as_ref())?;
            vault::check_health(&client, address).await?;
        }
    }
    Ok(())
}
