//! Utility functions for CLI operations.

use anyhow::{Context, Result};
use lightplay_core::{BleTransport, CommandOutcome, DeviceSession, DropReason, SessionConfig};
use lightplay_types::Port;

/// Open the adapter, find a toy and connect to it.
pub async fn connect_session(
    config: SessionConfig,
    quiet: bool,
) -> Result<DeviceSession<BleTransport>> {
    let transport = BleTransport::new()
        .await
        .context("No Bluetooth adapter available")?;
    let session = DeviceSession::new(transport, config);

    let light = session.scan().await.context("Failed to connect")?;
    if !quiet {
        eprintln!("Connected to {} ({})", light.label(), light.id);
    }
    Ok(session)
}

/// One-line description of a command outcome.
pub fn describe_outcome(outcome: CommandOutcome) -> &'static str {
    match outcome {
        CommandOutcome::Sent => "sent",
        CommandOutcome::Suppressed => "unchanged",
        CommandOutcome::Dropped(DropReason::NotConnected) => "dropped (not connected)",
        CommandOutcome::Dropped(DropReason::RateLimited) => "dropped (rate limited)",
        CommandOutcome::InFlight => "still being written",
    }
}

/// Render the cached state of `port`.
pub async fn describe_light(session: &DeviceSession<BleTransport>, port: Port) -> String {
    let status = session
        .status_of(port)
        .await
        .map(|s| s.to_string())
        .unwrap_or_else(|| "mixed".to_string());
    let color = session
        .color_of(port)
        .await
        .map(|c| c.to_string())
        .unwrap_or_else(|| "mixed".to_string());
    format!("{}: {} ({})", port, status, color)
}
