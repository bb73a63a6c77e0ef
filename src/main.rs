//! Lode - an incremental content compiler.

mod bundler;
mod cache;
mod cli;
mod config;
mod content;
mod format;
mod generate;
mod logger;
mod schema;
mod watch;

use anyhow::{Result, bail};
use cache::Cache;
use clap::Parser;
use cli::{Cli, Commands};
use config::LodeConfig;
use std::path::Path;
use watch::WatchOutcome;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build => run_build(&cli),
        Commands::Dev => run_dev(&cli),
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<LodeConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    if !config_path.exists() {
        bail!("Config file not found: {}", config_path.display());
    }

    let mut config = LodeConfig::from_path(&config_path)?;
    config.apply_cli(cli);
    config.validate()?;

    Ok(config)
}

/// One-shot generation pass.
fn run_build(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut cache = Cache::load(config.cache_path());
    generate::run(&config, &mut cache)?;
    Ok(())
}

/// Generation pass followed by the watch loop, inside an explicit restart
/// loop: a configuration dependency change drops the watcher and rebuilds
/// config and cache from disk before watching again.
fn run_dev(cli: &Cli) -> Result<()> {
    loop {
        let config = load_config(cli)?;
        let mut cache = Cache::load(config.cache_path());
        generate::run(&config, &mut cache)?;

        match watch::watch(&config, &mut cache)? {
            WatchOutcome::Restart => {
                log!("dev"; "configuration changed, restarting");
            }
            WatchOutcome::Shutdown => return Ok(()),
        }
    }
}
