//! Voxscape CLI - Character Voice and Ambience Engine
//!
//! Command-line interface for the Voxscape engine.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxscape::cli::{commands, Cli, Commands};
use voxscape::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Voxscape v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(sample_rate) = cli.sample_rate {
        config.sample_rate = sample_rate;
    }

    match cli.command {
        Some(cmd) => handle_command(cmd, config).await,
        None => {
            println!("Voxscape v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

async fn handle_command(cmd: Commands, config: EngineConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Profiles => commands::list_profiles()?,
        Commands::Speak {
            input,
            character,
            underwater,
        } => commands::speak(config, &input, &character, underwater)
            .with_context(|| format!("processing {}", input.display()))?,
        Commands::Ambience { theme, seconds } => {
            commands::render_ambience(config, &theme, seconds)?
        }
        Commands::Fingerprint => commands::fingerprint(config)?,
        Commands::Session => commands::session(config).await?,
    }
    Ok(())
}
