//! Scan command implementation.

use anyhow::{Context, Result};
use lightplay_core::{BleTransport, ScanOptions, SessionConfig, Transport};

pub async fn cmd_scan(config: &SessionConfig, quiet: bool) -> Result<()> {
    if !quiet {
        eprintln!(
            "Scanning for LightPlay toys ({}s)...",
            config.scan_duration.as_secs()
        );
    }

    let transport = BleTransport::new()
        .await
        .context("No Bluetooth adapter available")?;
    let options = ScanOptions::new().duration(config.scan_duration);
    let lights = transport
        .start_scan(&options)
        .await
        .context("Failed to scan for devices")?;

    if lights.is_empty() {
        if !quiet {
            eprintln!("No LightPlay toys found. Make sure the toy is on and in range.");
        }
        return Ok(());
    }

    for light in &lights {
        let rssi = light
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());
        println!("{:<24} {:<20} {}", light.id, light.label(), rssi);
    }
    Ok(())
}
