//! snipshelf command-line entry point.
//!
//! Logging goes to stderr so command output on stdout stays pipeable.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let mut config = snipshelf_core::AppConfig::load()?;
    if let Some(origin) = cli.origin {
        config.origin = origin;
    }
    tracing::debug!(environment = %config.environment, origin = %config.origin, "loaded configuration");

    match cli.command {
        Commands::Inject(args) => commands::build::inject(args),
        Commands::Worker(command) => commands::worker::run(command, &config).await,
        Commands::Offline(command) => commands::offline::run(command, &config).await,
        Commands::Mirror(command) => commands::offline::mirror(command, &config).await,
        Commands::Register => commands::register(&config),
    }
}

/// `RUST_LOG` wins; otherwise 0 = warn, 1 = info, 2+ = debug.
fn init_logging(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        EnvFilter::new(format!("snipshelf_core={level},snipshelf_client={level},snipshelf={level}"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
