//! PortGuard CLI - Resolve service port conflicts
//!
//! A command-line tool for deciding which port each configured service
//! binds to, reclaiming occupied ports and reporting conflicts.

mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "portguard")]
#[command(author, version, about = "Resolve service port conflicts")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (default: ~/.portguard/config.json)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the port for one service
    Resolve {
        /// Service name (e.g. main, database)
        service: String,

        /// Terminate processes holding the preferred port (SIGKILL)
        #[arg(short, long)]
        force: bool,
    },

    /// Resolve ports for every configured service
    #[command(name = "resolve-all", alias = "all")]
    ResolveAll {
        /// Terminate processes holding preferred ports (SIGKILL)
        #[arg(short, long)]
        force: bool,
    },

    /// Report port status and conflicts without changing anything
    Report {
        /// Also write the JSON report to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Check whether a port is in use
    Check { port: u16 },

    /// Kill the processes holding a port
    Free {
        port: u16,

        /// Send SIGTERM and wait briefly before SIGKILL
        #[arg(short, long)]
        graceful: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = commands::load_config(cli.config.as_deref()).await?;

    let success = match cli.command {
        Commands::Resolve { service, force } => {
            commands::resolve::one(config, &service, force, cli.json).await?
        }
        Commands::ResolveAll { force } => commands::resolve::all(config, force, cli.json).await?,
        Commands::Report { output } => {
            commands::report::run(config, output.as_deref(), cli.json).await?
        }
        Commands::Check { port } => commands::check::run(config, port, cli.json).await?,
        Commands::Free { port, graceful } => {
            commands::check::free(config, port, graceful, cli.json).await?
        }
        Commands::Config => commands::config::show(&config, cli.json)?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
