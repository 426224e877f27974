//! Core BLE library for LightPlay light toys.
//!
//! This crate drives a LightPlay toy (up to three addressable lights) over
//! Bluetooth Low Energy. It turns high-level light commands into 9-byte
//! command frames, writes them to the toy, and keeps a record of what each
//! light is showing so that commands which would change nothing are never
//! sent.
//!
//! # Features
//!
//! - **Device discovery**: Scan for LightPlay toys advertising the LightPlay service
//! - **Light commands**: Set, turn off, fade to a color, fade off
//! - **Surprise colors**: Random palette color that differs from the current one
//! - **Redundancy suppression**: Cached light state skips no-op commands
//! - **Rate limiting**: Token bucket on the write path (20 frames/s by default)
//! - **Events and metrics**: Lifecycle events and send-path counters
//! - **Mock transport**: Drive a session in tests without hardware
//!
//! # Platform Differences
//!
//! Peripheral ids are CoreBluetooth UUIDs on macOS and MAC addresses on
//! Linux and Windows. A macOS id is stable on one Mac but differs between
//! Macs, so configure a device by name when the same setup runs on several
//! machines.
//!
//! # Quick Start
//!
//! ```no_run
//! use lightplay_core::{BleTransport, DeviceSession, SessionConfig};
//! use lightplay_core::types::{Color, ColorChoice, Port};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = BleTransport::new().await?;
//!     let session = DeviceSession::new(transport, SessionConfig::default());
//!
//!     let light = session.scan().await?;
//!     println!("Connected to {}", light.label());
//!
//!     session.set_color(Port::Light1, Color::Red.into()).await?;
//!     session.fade_to_color(Port::AllLights, ColorChoice::Surprise).await?;
//!     session.fade_off(Port::AllLights).await?;
//!
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod error;
pub mod events;
pub mod limiter;
pub mod metrics;
pub mod mock;
pub mod scan;
pub mod session;
pub mod state;
pub mod transport;
pub mod util;

pub use ble::{BleTransport, ConnectionConfig};
pub use error::{DeviceNotFoundReason, Error, Result};
pub use events::{
    DisconnectReason, DropReason, EventDispatcher, EventReceiver, EventSender, SessionEvent,
    SessionState,
};
pub use limiter::{DEFAULT_MAX_SENDS_PER_SECOND, RateLimiter};
pub use metrics::{AtomicSendMetrics, SendMetrics};
pub use mock::{MockTransport, RecordedWrite};
pub use scan::{DiscoveredLight, ScanOptions};
pub use session::{
    CommandOutcome, DEFAULT_FADE_DURATION, DEFAULT_PACING_DELAY, DEFAULT_SCAN_DURATION,
    DeviceSession, SessionConfig,
};
pub use state::{Intent, LightStateCache};
pub use transport::{NotificationCallback, Transport};

// Re-export the protocol types so callers need only one dependency.
pub use lightplay_types as types;
pub use lightplay_types::uuid as uuids;
pub use lightplay_types::{
    Color, ColorChoice, CommandFrame, LightState, LightStatus, ParseError, Port, Transition,
};

// Re-export btleplug types used in the public API.
pub use btleplug::api::WriteType;
