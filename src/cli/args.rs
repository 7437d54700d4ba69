//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// stagecache - cached, staged container image builds
///
/// Builds an image as a chain of stages and reuses every stage whose
/// inputs have not changed since the last build.
#[derive(Parser, Debug)]
#[command(name = "stagecache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path (default: nearest stagecache.toml)
    #[arg(short, long, global = true, env = "STAGECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep the failed build container as an image and open a shell in it
    #[arg(long, global = true)]
    pub introspect_error: bool,

    /// Open a shell in the image the failing commands ran on
    #[arg(long, global = true)]
    pub introspect_before_error: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build all stages, reusing cached stage images
    Build,

    /// Show stage signatures and their inputs
    Stages(StagesArgs),

    /// Push the final stage image to a registry under another name
    Export(ImageNameArgs),

    /// Pull an image from a registry and use it as the final stage image
    Import(ImageNameArgs),

    /// Show labels of the final stage image as JSON
    Labels,
}

/// Arguments for the stages command
#[derive(Parser, Debug)]
pub struct StagesArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for export and import
#[derive(Parser, Debug)]
pub struct ImageNameArgs {
    /// Registry image reference, e.g. registry.local/app:1.0
    pub name: String,
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
