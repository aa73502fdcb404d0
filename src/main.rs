//! tpod - object detector training
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tpod::cli::args::ConfigAction;
use tpod::cli::{commands, Cli, Commands};
use tpod::config::{Config, ConfigManager};
use tpod::error::TpodResult;
use tpod::provider::ProviderRegistry;
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

async fn run() -> TpodResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Init must work even when the existing file is broken
    let config = match cli.command {
        Commands::Config(ref args) if matches!(args.action, Some(ConfigAction::Init { .. })) => {
            Config::default()
        }
        _ => config_manager.load().await?,
    };

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    let registry = ProviderRegistry::builtin()?;

    match cli.command {
        Commands::Types(args) => commands::types(args, &registry).await,
        Commands::Describe(args) => commands::describe(args, &registry).await,
        Commands::Prepare(args) => commands::prepare(args, &config, &registry).await,
        Commands::Train(args) => commands::train(args, &config, &registry).await,
        Commands::Cache(args) => commands::cache(args, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.log_format = "json"` switches to JSON lines
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("tpod=warn"),
        1 => EnvFilter::new("tpod=info"),
        _ => EnvFilter::new("tpod=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
