//! genrepo CLI entry point

use clap::Parser;
use console::style;
use genrepo::cli::{commands, Cli, Commands};
use genrepo::config::ConfigManager;
use genrepo::error::GenrepoResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Logging goes to stderr; stdout carries command output
fn init_logging(verbose: u8, format: &str) {
    // 0 = warn, 1 = info, 2+ = debug
    let filter = match verbose {
        0 => EnvFilter::new("genrepo=warn"),
        1 => EnvFilter::new("genrepo=info"),
        _ => EnvFilter::new("genrepo=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

async fn run() -> GenrepoResult<ExitCode> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Config commands must work even when the file does not parse
    if let Commands::Config(args) = cli.command {
        init_logging(cli.verbose, "text");
        commands::config(args, &manager).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = manager.load().await?;
    init_logging(cli.verbose, &config.general.log_format);
    debug!("Loaded configuration from {}", manager.path().display());

    ConfigManager::ensure_state_dirs().await?;

    match cli.command {
        Commands::Config(_) => unreachable!("Config handled above"),
        Commands::Resolve(args) => {
            let found = commands::resolve(args, &config).await?;
            Ok(if found {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Serve(args) => {
            commands::serve(args, &config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cache(args) => {
            commands::cache(args, &config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
