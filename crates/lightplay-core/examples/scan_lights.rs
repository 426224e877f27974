//! Example: Scanning for LightPlay toys
//!
//! This example scans for peripherals advertising the LightPlay service and
//! prints what it finds.
//!
//! Run with: `cargo run --example scan_lights`

use lightplay_core::{BleTransport, ScanOptions, Transport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("Scanning for LightPlay toys...");
    println!();

    let transport = BleTransport::new().await?;
    let lights = transport
        .start_scan(&ScanOptions::new().duration_secs(10))
        .await?;

    if lights.is_empty() {
        println!("No LightPlay toys found.");
        println!();
        println!("Make sure:");
        println!("  - The toy is switched on");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - The toy is within range");
        return Ok(());
    }

    println!("Found {} toy(s):", lights.len());
    println!();
    for light in &lights {
        let rssi = light
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());

        println!("  {}", light.label());
        println!("    Identifier: {}", light.id);
        println!("    RSSI: {}", rssi);
        println!();
    }

    Ok(())
}
