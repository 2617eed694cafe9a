//! gitdrop CLI - commit local files to a remote git repository.
//!
//! Reads configuration, sets up logging, and hands uploads to
//! `gitdrop-upload`. Exit code 2 means the request itself was at fault;
//! 1 means anything else failed.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config_bridge;
mod theme;

use commands::{config, provider, upload};

/// gitdrop - push files to a git repository in one step
#[derive(Parser)]
#[command(name = "gitdrop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Additional config file, applied over system and user config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit files (zip archives are expanded) and push them to a branch
    Upload(upload::UploadArgs),

    /// Print the hosting provider detected for a repository URL
    Provider {
        /// Repository URL
        url: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration with the source of each value
    Show {
        /// Output format: toml or json
        #[arg(short, long, default_value = "toml")]
        format: String,

        /// Only show one section (upload, git, archive, logging)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// List config files and environment variables that are consulted
    Paths,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = gitdrop_config::Config::load(cli.config.as_deref());

    let mut log_config = match &loaded {
        Ok(resolved) => config_bridge::to_log_config(&resolved.config),
        Err(_) => gitdrop_telemetry::LogConfig::new("info"),
    };
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = gitdrop_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Upload(args) => upload::run(args, &loaded?.config).await,
        Commands::Provider { url, json } => {
            provider::run(&url, json)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Config { command } => {
            match command {
                ConfigCommands::Show { format, section } => {
                    config::show_config(&loaded?, &format, section.as_deref())?;
                },
                ConfigCommands::Paths => config::show_paths(cli.config.as_deref())?,
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}
