//! Example: A short light show
//!
//! Connects to the first LightPlay toy found (or the one named by the
//! `LIGHTPLAY_DEVICE` environment variable), walks each light through a few
//! colors and fades everything out.
//!
//! Run with: `cargo run --example light_show`

use lightplay_core::types::{Color, ColorChoice, Port};
use lightplay_core::{BleTransport, DeviceSession, SessionConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut config = SessionConfig::new();
    if let Ok(device) = std::env::var("LIGHTPLAY_DEVICE") {
        config = config.device(device);
    }

    let session = DeviceSession::new(BleTransport::new().await?, config);
    let light = session.scan().await?;
    println!("Connected to {}", light.label());

    for (port, color) in Port::LIGHTS
        .into_iter()
        .zip([Color::Red, Color::Green, Color::Blue])
    {
        session.set_color(port, color.into()).await?;
    }

    for _ in 0..5 {
        session
            .fade_to_color(Port::AllLights, ColorChoice::Surprise)
            .await?;
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    }

    session.fade_off(Port::AllLights).await?;
    println!("Sent: {:?}", session.metrics());

    session.disconnect().await?;
    Ok(())
}
