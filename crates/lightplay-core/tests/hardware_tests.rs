//! Hardware tests against a real LightPlay toy.
//!
//! These tests require a powered-on toy in range and should be run with:
//! ```text
//! cargo test --package lightplay-core --test hardware_tests -- --ignored --nocapture
//! ```
//!
//! Set `LIGHTPLAY_DEVICE` to pick a toy by id or name when several are in
//! range:
//! ```text
//! LIGHTPLAY_DEVICE="LightPlay" cargo test --package lightplay-core --test hardware_tests -- --ignored
//! ```

use std::env;
use std::time::Duration;

use lightplay_core::types::{Color, ColorChoice, LightStatus, Port};
use lightplay_core::{
    BleTransport, CommandOutcome, DeviceSession, ScanOptions, SessionConfig, SessionState,
    Transport,
};
use tokio::time::timeout;

/// Default timeout for BLE operations.
const BLE_TIMEOUT: Duration = Duration::from_secs(30);

fn session_config() -> SessionConfig {
    match env::var("LIGHTPLAY_DEVICE") {
        Ok(device) => SessionConfig::new().device(device),
        Err(_) => SessionConfig::new(),
    }
}

async fn connected_session() -> DeviceSession<BleTransport> {
    let transport = BleTransport::new().await.expect("No Bluetooth adapter");
    let session = DeviceSession::new(transport, session_config());

    match timeout(BLE_TIMEOUT, session.scan()).await {
        Ok(Ok(light)) => println!("Connected to {} ({})", light.label(), light.id),
        Ok(Err(e)) => panic!("Scan failed: {}", e),
        Err(_) => panic!("Scan timed out after {:?}", BLE_TIMEOUT),
    }
    session
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_scan_finds_toy() {
    let transport = BleTransport::new().await.expect("No Bluetooth adapter");
    let options = ScanOptions::new().duration_secs(10);

    let found = timeout(BLE_TIMEOUT, transport.start_scan(&options))
        .await
        .expect("Scan timed out")
        .expect("Scan failed");

    println!("Found {} LightPlay device(s)", found.len());
    for light in &found {
        println!("  {} ({}) rssi={:?}", light.label(), light.id, light.rssi);
    }
    assert!(!found.is_empty(), "No LightPlay toy in range");
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_color_cycle() {
    let session = connected_session().await;

    for color in Color::ALL {
        let outcome = session
            .set_color(Port::AllLights, color.into())
            .await
            .expect("Write failed");
        println!("{} -> {:?}", color, outcome);
    }
    assert_eq!(
        session.status_of(Port::AllLights).await,
        Some(LightStatus::On)
    );

    session.fade_off(Port::AllLights).await.expect("Write failed");
    session.disconnect().await.expect("Disconnect failed");
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_fade_and_surprise() {
    let session = connected_session().await;

    for port in Port::LIGHTS {
        let outcome = session
            .fade_to_color(port, ColorChoice::Surprise)
            .await
            .expect("Write failed");
        assert!(matches!(
            outcome,
            CommandOutcome::Sent | CommandOutcome::InFlight
        ));
    }

    // Give the fade time to finish before going dark.
    tokio::time::sleep(Duration::from_secs(2)).await;
    session.fade_off(Port::AllLights).await.expect("Write failed");
    session.disconnect().await.expect("Disconnect failed");
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_reconnect_after_disconnect() {
    let session = connected_session().await;
    let id = session.linked_id().await.expect("No link after scan");

    session
        .set_color(Port::Light1, Color::Green.into())
        .await
        .expect("Write failed");
    session.disconnect().await.expect("Disconnect failed");
    assert_eq!(session.state().await, SessionState::Disconnected);

    tokio::time::sleep(Duration::from_secs(2)).await;

    timeout(BLE_TIMEOUT, session.connect(&id))
        .await
        .expect("Reconnect timed out")
        .expect("Reconnect failed");
    assert_eq!(
        session.status_of(Port::Light1).await,
        Some(LightStatus::Off)
    );

    let metrics = session.metrics();
    println!("Metrics: {:?}", metrics);
    assert_eq!(metrics.failed, 0);

    session.disconnect().await.expect("Disconnect failed");
}
