//! Cirrus CLI - Command line interface for platform operations.
//!
//! This tool provides a command-line interface for provisioning and
//! inspecting tenants.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cirrus_common::Config;
use cirrus_docstore::{CouchDocStore, DocumentStore, MemoryDocStore};
use cirrus_tenant::TenantRegistry;

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(about = "Cirrus - Personal cloud platform management")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tenants.
    Tenants {
        #[command(subcommand)]
        command: TenantCommands,
    },
}

#[derive(Subcommand)]
enum TenantCommands {
    /// Provision a new tenant.
    Add {
        /// Tenant domain, like alice.example.com.
        domain: String,

        /// Tenant locale.
        #[arg(short, long, default_value = "en")]
        locale: String,

        /// Applications to install once the apps subsystem lands.
        #[arg(short, long)]
        apps: Vec<String>,
    },

    /// Show an existing tenant.
    Show {
        /// Tenant domain.
        domain: String,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set up logging");
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn build_docstore(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    match &config.docstore_url {
        Some(url) => Ok(Arc::new(
            CouchDocStore::new(url).context("Failed to set up document store")?,
        )),
        None => {
            tracing::warn!("no document store configured, records will not survive this process");
            Ok(Arc::new(MemoryDocStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_ref())?;
    let docs = build_docstore(&config)?;
    let registry =
        TenantRegistry::new(docs, &config).context("Failed to set up tenant registry")?;

    match cli.command {
        Commands::Tenants { command } => match command {
            TenantCommands::Add {
                domain,
                locale,
                apps,
            } => {
                let record = registry
                    .create(&domain, &locale, &apps)
                    .await
                    .with_context(|| format!("Failed to provision tenant '{}'", domain))?;
                println!("Tenant '{}' provisioned", record.domain);
                println!("  id:      {}", record.id);
                println!("  storage: {}", record.storage_locator);
            }
            TenantCommands::Show { domain } => {
                let record = registry.get(&domain).await?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        },
    }

    Ok(())
}
