use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod util;

use cli::{Cli, Commands};
use commands::{LightCommand, cmd_demo, cmd_light, cmd_scan};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let session_config = config.session_config(&cli.device)?;
    tracing::debug!("Session config: {:?}", session_config);

    match cli.command {
        Commands::Scan => cmd_scan(&session_config, cli.quiet).await,
        Commands::On { port, color } => {
            cmd_light(LightCommand::On(port, color), session_config, cli.quiet).await
        }
        Commands::Off { port } => {
            cmd_light(LightCommand::Off(port), session_config, cli.quiet).await
        }
        Commands::Fade { port, color } => {
            cmd_light(LightCommand::Fade(port, color), session_config, cli.quiet).await
        }
        Commands::FadeOff { port } => {
            cmd_light(LightCommand::FadeOff(port), session_config, cli.quiet).await
        }
        Commands::Demo { cycles } => cmd_demo(cycles, session_config, cli.quiet).await,
    }
}
