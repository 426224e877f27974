//! Transport abstraction for the BLE link.
//!
//! [`crate::DeviceSession`] never talks to a Bluetooth stack directly. It
//! drives a [`Transport`], which is implemented by
//! [`crate::BleTransport`] for real hardware and [`crate::MockTransport`]
//! for tests.

use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::WriteType;
use uuid::Uuid;

use crate::error::Result;
use crate::scan::{DiscoveredLight, ScanOptions};

/// Callback invoked with the payload of each notification.
pub type NotificationCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// The narrow BLE interface a session needs.
///
/// A transport holds at most one peripheral link at a time.
///
/// # Example
///
/// ```ignore
/// use lightplay_core::{Transport, Result};
/// use lightplay_core::uuids::{LIGHTPLAY_SERVICE, RX_CHARACTERISTIC};
/// use btleplug::api::WriteType;
///
/// async fn blink<T: Transport>(transport: &T) -> Result<()> {
///     let frame = [72, 15, 255, 0, 0, 0, 0, 0, 0];
///     transport
///         .write(LIGHTPLAY_SERVICE, RX_CHARACTERISTIC, &frame, WriteType::WithResponse)
///         .await
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Discover peripherals matching the scan options.
    ///
    /// Returns an empty list (not an error) when nothing was found.
    async fn start_scan(&self, options: &ScanOptions) -> Result<Vec<DiscoveredLight>>;

    /// Establish a link to a discovered peripheral.
    ///
    /// Completes once the link is usable for writes.
    async fn connect_peripheral(&self, id: &str) -> Result<()>;

    /// Release the current link, if any.
    async fn disconnect(&self) -> Result<()>;

    /// Whether a link is currently up.
    async fn is_connected(&self) -> bool;

    /// Write `payload` to a characteristic of the linked peripheral.
    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
        write_type: WriteType,
    ) -> Result<()>;

    /// Receive notifications from a characteristic of the linked peripheral.
    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
        on_notify: NotificationCallback,
    ) -> Result<()>;
}
