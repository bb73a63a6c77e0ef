//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lode content compiler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: lode.toml)
    #[arg(short = 'C', long, default_value = "lode.toml")]
    pub config: PathBuf,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile all document types once and exit
    Build,

    /// Compile, then watch the content directory and recompile on change
    Dev,
}

#[allow(unused)]
impl Cli {
    pub const fn is_dev(&self) -> bool {
        matches!(self.command, Commands::Dev)
    }
}
