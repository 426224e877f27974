//! Demo command: cycle surprise colors across every light.

use std::time::Duration;

use anyhow::{Context, Result};
use lightplay_core::{SessionConfig, SessionEvent};
use lightplay_types::{ColorChoice, Port};
use tracing::debug;

use crate::util::{connect_session, describe_light};

pub async fn cmd_demo(cycles: u32, config: SessionConfig, quiet: bool) -> Result<()> {
    let fade = config.fade_duration;
    let session = connect_session(config, quiet).await?;

    let mut events = session.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SessionEvent::SendDropped { frame, reason } = &event {
                debug!("Dropped {:02X?}: {:?}", frame, reason);
            }
        }
    });

    for cycle in 1..=cycles {
        for port in Port::LIGHTS {
            session
                .fade_to_color(port, ColorChoice::Surprise)
                .await
                .context("Failed to send command")?;
        }
        tokio::time::sleep(fade).await;

        if !quiet {
            eprintln!("Cycle {}/{}", cycle, cycles);
            for port in Port::LIGHTS {
                eprintln!("  {}", describe_light(&session, port).await);
            }
        }
    }

    session
        .fade_off(Port::AllLights)
        .await
        .context("Failed to send command")?;
    tokio::time::sleep(fade.min(Duration::from_secs(2))).await;
    session.disconnect().await.context("Failed to disconnect")?;
    logger.abort();

    let metrics = session.metrics();
    if !quiet {
        eprintln!(
            "Frames written: {}, unchanged: {}, dropped: {}, failed: {}",
            metrics.written,
            metrics.suppressed,
            metrics.dropped(),
            metrics.failed
        );
    }
    Ok(())
}
