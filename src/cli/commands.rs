use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::api::server;
use crate::domain::QueryMode;
use crate::fhir::LabFetcher;
use crate::infra::config::BackendKind;
use crate::infra::{error_chain, logging, AppConfig, ConfigManager};
use crate::llm;
use crate::prompts::*;

#[derive(Parser)]
#[command(name = "labsense")]
#[command(about = "Plain-language explanations for FHIR lab results", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (default: ./.labsense.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init,

    /// Start the HTTP server
    Serve {
        /// Address to bind, overrides the configuration
        #[arg(long)]
        bind: Option<String>,
    },

    /// Check configuration and upstream reachability
    Health,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init_command(cli.config),
        Commands::Serve { bind } => serve_command(cli.config, bind).await,
        Commands::Health => health_command(cli.config).await,
    }
}

fn init_command(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(ConfigManager::CONFIG_FILE));

    if ConfigManager::create_default(&path)? {
        println!("{} ({})", MSG_CONFIG_CREATED, path.display());
    } else {
        println!("{} {}: {}", "⚠️".yellow(), MSG_CONFIG_EXISTS, path.display());
    }

    Ok(())
}

async fn serve_command(path: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    logging::init();

    let mut config = ConfigManager::new(path.as_deref())?.get()?;
    if let Some(bind) = bind {
        config.bind = bind;
    }

    server::serve(&config).await
}

async fn health_command(path: Option<PathBuf>) -> Result<()> {
    println!("{}", MSG_HEALTH_CHECK.bold());

    let loaded = ConfigManager::new(path.as_deref())
        .and_then(|manager| Ok((manager.get()?, manager.path().display().to_string())));
    let config = match loaded {
        Ok((config, source)) => {
            println!("{} ({})", MSG_CONFIG_OK, source);
            config
        }
        Err(e) => {
            println!("{} {}: {:#}", "✗".red(), MSG_CONFIG_ERROR, e);
            println!("{}", MSG_ISSUES_DETECTED.yellow().bold());
            return Ok(());
        }
    };

    print_config(&config);

    let mut all_ok = true;

    let fetcher = LabFetcher::new(config.fhir.base_url.clone(), config.fhir.count);
    match fetcher.check_metadata().await {
        Ok(()) => println!("{}: {}", MSG_FHIR_OK, fetcher.base_url()),
        Err(e) => {
            println!("{} {}: {}", "✗".red(), MSG_FHIR_ERROR, error_chain(&e));
            all_ok = false;
        }
    }

    println!("{}", MSG_BACKEND_HEADER);
    match llm::build_backend(&config) {
        Ok(backend) => println!("  ✓ {} backend ready", backend.name()),
        Err(e) => {
            println!("  {} {:#}", "✗".red(), e);
            all_ok = false;
        }
    }

    if all_ok {
        println!("{}", MSG_ALL_SYSTEMS_OK.green().bold());
    } else {
        println!("{}", MSG_ISSUES_DETECTED.yellow().bold());
    }

    Ok(())
}

fn print_config(config: &AppConfig) {
    println!("  Bind address: {}", config.bind);
    println!("  FHIR base: {}", config.fhir.base_url);
    println!(
        "  Query mode: {:?} (count {}{})",
        config.fhir.mode,
        config.fhir.count,
        match config.fhir.mode {
            QueryMode::Code => format!(", code {}", config.fhir.code),
            QueryMode::Patient => String::new(),
        }
    );

    let target = match config.backend {
        BackendKind::Inference => config.inference.url.as_str(),
        BackendKind::Chat => config.chat.model.as_str(),
        BackendKind::Local => config.local.model.as_str(),
    };
    println!("  Backend: {:?} ({})", config.backend, target);

    if config.expose_error_details {
        println!(
            "  {} Error details are returned in 500 responses (LABSENSE_EXPOSE_ERRORS=false to hide)",
            "⚠️".yellow()
        );
    }
}
