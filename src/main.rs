//! stagecache - staged container image builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use stagecache::cli::commands::GlobalOptions;
use stagecache::cli::{Cli, Commands};
use stagecache::config::ConfigManager;
use stagecache::error::{BuildError, BuildResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BuildResult<()> {
    let cli = Cli::parse();

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("stagecache=warn"),
        1 => EnvFilter::new("stagecache=info"),
        _ => EnvFilter::new("stagecache=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // An explicit --config must exist; otherwise use the nearest project file
    let config = match cli.config {
        Some(ref path) => {
            ConfigManager::with_path(path.clone())
                .load_from_file(path)
                .await?
        }
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| BuildError::io("getting current directory", e))?;
            let manager = match ConfigManager::find_local_config(&cwd) {
                Some(path) => {
                    debug!("Found project config: {}", path.display());
                    ConfigManager::with_path(path)
                }
                None => ConfigManager::new(),
            };
            manager.load().await?
        }
    };

    let options = GlobalOptions {
        introspect_error: cli.introspect_error,
        introspect_before_error: cli.introspect_before_error,
    };

    match cli.command {
        Commands::Build => stagecache::cli::commands::build(&config, options).await,
        Commands::Stages(args) => stagecache::cli::commands::stages(args, &config, options).await,
        Commands::Export(args) => stagecache::cli::commands::export(args, &config, options).await,
        Commands::Import(args) => stagecache::cli::commands::import(args, &config, options).await,
        Commands::Labels => stagecache::cli::commands::labels(&config, options).await,
    }
}
