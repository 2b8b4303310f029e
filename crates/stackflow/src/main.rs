mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackflow")]
#[command(about = "Ordered, idempotent deployment of infrastructure stacks", long_about = None)]
struct Cli {
    /// Manifest path (default: stacks.kdl in the current directory)
    #[arg(short, long, env = "STACKFLOW_MANIFEST", global = true)]
    manifest: Option<PathBuf>,

    /// AWS region (default: the manifest's cluster region)
    #[arg(short, long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy all stacks in dependency order
    Deploy {
        /// Emit the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all stacks in reverse dependency order
    Teardown {
        /// Confirmation token; must equal the project name exactly
        #[arg(long)]
        confirm: Option<String>,
        /// Command to remove application-layer resources first (best effort)
        #[arg(long)]
        pre_hook: Option<String>,
        /// Emit the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show per-stack deployment status
    Status {
        /// Restrict to one stack
        stack: Option<String>,
    },
    /// Show a settled stack's output values
    Outputs {
        /// Stack name
        stack: String,
        /// Emit outputs as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the manifest and dependency graph
    Validate,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    if matches!(cli.command, Commands::Version) {
        println!("stackflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (manifest, config) = match utils::load_manifest(cli.manifest.as_deref(), cli.region) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(2);
        }
    };

    let exit_code = match cli.command {
        Commands::Deploy { json } => commands::deploy::handle(&manifest, config, json).await,
        Commands::Teardown {
            confirm,
            pre_hook,
            json,
        } => commands::teardown::handle(&manifest, config, confirm, pre_hook, json).await,
        Commands::Status { stack } => commands::status::handle(&manifest, config, stack).await,
        Commands::Outputs { stack, json } => {
            commands::outputs::handle(&manifest, config, &stack, json).await
        }
        Commands::Validate => commands::validate::handle(&manifest),
        Commands::Version => unreachable!("handled above"),
    };

    match exit_code {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(2);
        }
    }
}
