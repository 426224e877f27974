//! Light commands: on, off, fade, fade-off.

use anyhow::{Context, Result};
use lightplay_core::SessionConfig;
use lightplay_types::{ColorChoice, Port};

use crate::util::{connect_session, describe_light, describe_outcome};

/// A single light command from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
    On(Port, ColorChoice),
    Off(Port),
    Fade(Port, ColorChoice),
    FadeOff(Port),
}

impl LightCommand {
    fn port(self) -> Port {
        match self {
            LightCommand::On(port, _)
            | LightCommand::Off(port)
            | LightCommand::Fade(port, _)
            | LightCommand::FadeOff(port) => port,
        }
    }
}

pub async fn cmd_light(command: LightCommand, config: SessionConfig, quiet: bool) -> Result<()> {
    let session = connect_session(config, quiet).await?;

    let outcome = match command {
        LightCommand::On(port, color) => session.set_color(port, color).await,
        LightCommand::Off(port) => session.set_off(port).await,
        LightCommand::Fade(port, color) => session.fade_to_color(port, color).await,
        LightCommand::FadeOff(port) => session.fade_off(port).await,
    }
    .context("Failed to send command")?;

    if !quiet {
        eprintln!("Command {}", describe_outcome(outcome));
    }
    println!("{}", describe_light(&session, command.port()).await);

    session.disconnect().await.context("Failed to disconnect")?;
    Ok(())
}
