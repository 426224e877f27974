//! Mock transport for testing.
//!
//! This module provides an in-memory [`Transport`] that can be used for unit
//! testing a [`crate::DeviceSession`] without BLE hardware.
//!
//! # Features
//!
//! - **Write capture**: every frame written is recorded in order
//! - **Scripted discovery**: choose which peripherals a scan reports
//! - **Failure injection**: fail connects, all writes, or the next N writes
//! - **Latency simulation**: delay writes to model a slow link
//! - **Link loss**: drop the link as if the toy went out of range

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::WriteType;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scan::{DiscoveredLight, ScanOptions};
use crate::transport::{NotificationCallback, Transport};
use crate::uuids::RX_CHARACTERISTIC;

/// A write captured by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    /// Target service.
    pub service: Uuid,
    /// Target characteristic.
    pub characteristic: Uuid,
    /// Bytes written.
    pub payload: Vec<u8>,
    /// Requested write type.
    pub write_type: WriteType,
}

/// An in-memory transport for testing.
///
/// # Example
///
/// ```
/// use lightplay_core::{DeviceSession, MockTransport, SessionConfig};
/// use lightplay_core::types::{Color, Port};
///
/// #[tokio::main]
/// async fn main() {
///     let session = DeviceSession::new(MockTransport::with_light("toy"), SessionConfig::default());
///     session.scan().await.unwrap();
///     session.set_color(Port::Light1, Color::Red.into()).await.unwrap();
///
///     // reset + fade duration + the color frame
///     assert_eq!(session.transport().frames().await.len(), 3);
/// }
/// ```
#[derive(Default)]
pub struct MockTransport {
    peripherals: RwLock<Vec<DiscoveredLight>>,
    linked: RwLock<Option<String>>,
    writes: RwLock<Vec<RecordedWrite>>,
    subscriptions: RwLock<Vec<(Uuid, Uuid, NotificationCallback)>>,
    scan_count: AtomicU32,
    connect_count: AtomicU32,
    disconnect_count: AtomicU32,
    fail_connect: AtomicBool,
    fail_writes: AtomicBool,
    remaining_write_failures: AtomicU32,
    write_latency_ms: AtomicU64,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("scan_count", &self.scan_count.load(Ordering::Relaxed))
            .field("connect_count", &self.connect_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Create a mock that discovers nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that discovers a single peripheral with this id.
    pub fn with_light(id: &str) -> Self {
        Self::with_peripherals(vec![DiscoveredLight::new(id, Some("LightPlay".to_string()))])
    }

    /// Create a mock that discovers the given peripherals, in order.
    pub fn with_peripherals(peripherals: Vec<DiscoveredLight>) -> Self {
        Self {
            peripherals: RwLock::new(peripherals),
            ..Self::default()
        }
    }

    // --- Test control methods ---

    /// Replace the peripherals reported by the next scan.
    pub async fn set_peripherals(&self, peripherals: Vec<DiscoveredLight>) {
        *self.peripherals.write().await = peripherals;
    }

    /// Make every connect attempt fail.
    pub fn set_should_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::Relaxed);
    }

    /// Make every write fail.
    pub fn set_should_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` writes, then succeed.
    pub fn set_transient_write_failures(&self, count: u32) {
        self.remaining_write_failures.store(count, Ordering::Relaxed);
    }

    /// Delay each write by `latency`.
    ///
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub fn set_write_latency(&self, latency: Duration) {
        self.write_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Drop the link as if the peripheral went away.
    pub async fn drop_link(&self) {
        *self.linked.write().await = None;
    }

    /// Deliver a notification to every subscriber of `characteristic`.
    pub async fn notify(&self, characteristic: Uuid, data: &[u8]) {
        for (_, subscribed, callback) in self.subscriptions.read().await.iter() {
            if *subscribed == characteristic {
                callback(data);
            }
        }
    }

    // --- Inspection ---

    /// All writes in order.
    pub async fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().await.clone()
    }

    /// Payloads written to the RX characteristic, in order.
    pub async fn frames(&self) -> Vec<Vec<u8>> {
        self.writes
            .read()
            .await
            .iter()
            .filter(|w| w.characteristic == RX_CHARACTERISTIC)
            .map(|w| w.payload.clone())
            .collect()
    }

    /// Forget recorded writes.
    pub async fn clear_writes(&self) {
        self.writes.write().await.clear();
    }

    /// Characteristics subscribed to, as (service, characteristic).
    pub async fn subscriptions(&self) -> Vec<(Uuid, Uuid)> {
        self.subscriptions
            .read()
            .await
            .iter()
            .map(|(service, characteristic, _)| (*service, *characteristic))
            .collect()
    }

    /// Id of the linked peripheral, if any.
    pub async fn linked_id(&self) -> Option<String> {
        self.linked.read().await.clone()
    }

    /// Number of scans performed.
    pub fn scan_count(&self) -> u32 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::Relaxed)
    }

    /// Number of disconnect calls.
    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count.load(Ordering::Relaxed)
    }

    fn take_write_failure(&self) -> bool {
        if self.fail_writes.load(Ordering::Relaxed) {
            return true;
        }
        self.remaining_write_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn start_scan(&self, _options: &ScanOptions) -> Result<Vec<DiscoveredLight>> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.peripherals.read().await.clone())
    }

    async fn connect_peripheral(&self, id: &str) -> Result<()> {
        if self.fail_connect.load(Ordering::Relaxed) {
            return Err(Error::connection_failed(
                Some(id.to_string()),
                "mock connect failure",
            ));
        }
        let known = self.peripherals.read().await.iter().any(|p| p.id == id);
        if !known {
            return Err(Error::device_not_found(id));
        }

        // A new link replaces the old one and its subscriptions.
        self.subscriptions.write().await.clear();
        *self.linked.write().await = Some(id.to_string());
        self.connect_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_count.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.write().await.clear();
        *self.linked.write().await = None;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.linked.read().await.is_some()
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        let latency = self.write_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.linked.read().await.is_none() {
            return Err(Error::NotConnected);
        }
        if self.take_write_failure() {
            return Err(Error::write_failed(
                characteristic.to_string(),
                "mock write failure",
            ));
        }

        self.writes.write().await.push(RecordedWrite {
            service,
            characteristic,
            payload: payload.to_vec(),
            write_type,
        });
        Ok(())
    }

    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
        on_notify: NotificationCallback,
    ) -> Result<()> {
        if self.linked.read().await.is_none() {
            return Err(Error::NotConnected);
        }
        self.subscriptions
            .write()
            .await
            .push((service, characteristic, on_notify));
        Ok(())
    }
}
