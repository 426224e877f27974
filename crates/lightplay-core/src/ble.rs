//! btleplug-backed [`Transport`] for real LightPlay hardware.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scan::{DiscoveredLight, ScanOptions, find_peripheral_by_identifier, get_adapter};
use crate::transport::{NotificationCallback, Transport};

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for BLE connection timeouts.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use lightplay_core::ble::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .write_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }
}

/// An established link to one peripheral.
struct Link {
    id: String,
    peripheral: Peripheral,
    /// Characteristics keyed by (service, characteristic) for O(1) lookups.
    characteristics: HashMap<(Uuid, Uuid), Characteristic>,
    notification_handles: Vec<JoinHandle<()>>,
}

impl Link {
    fn abort_notifications(&mut self) {
        for handle in self.notification_handles.drain(..) {
            handle.abort();
        }
    }
}

/// BLE transport built on btleplug.
///
/// Holds the adapter for its whole lifetime and at most one peripheral link.
pub struct BleTransport {
    adapter: Adapter,
    config: ConnectionConfig,
    link: Mutex<Option<Link>>,
}

impl std::fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BleTransport {
    /// Create a transport on the first available adapter.
    pub async fn new() -> Result<Self> {
        Self::with_config(ConnectionConfig::default()).await
    }

    /// Create a transport on the first available adapter with custom timeouts.
    pub async fn with_config(config: ConnectionConfig) -> Result<Self> {
        let adapter = get_adapter().await?;
        Ok(Self::from_adapter(adapter, config))
    }

    /// Create a transport on a specific adapter.
    pub fn from_adapter(adapter: Adapter, config: ConnectionConfig) -> Self {
        Self {
            adapter,
            config,
            link: Mutex::new(None),
        }
    }

    /// Get the current connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Clone the peripheral and characteristic out of the link so the lock
    /// is not held across BLE I/O.
    async fn characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<(Peripheral, Characteristic)> {
        let link = self.link.lock().await;
        let link = link.as_ref().ok_or(Error::NotConnected)?;
        let found = link
            .characteristics
            .get(&(service, characteristic))
            .cloned()
            .ok_or_else(|| {
                Error::characteristic_not_found(
                    characteristic.to_string(),
                    link.peripheral.services().len(),
                )
            })?;
        Ok((link.peripheral.clone(), found))
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn start_scan(&self, options: &ScanOptions) -> Result<Vec<DiscoveredLight>> {
        crate::scan::scan_with_adapter(&self.adapter, options).await
    }

    #[tracing::instrument(level = "info", skip(self))]
    async fn connect_peripheral(&self, id: &str) -> Result<()> {
        let mut link = self.link.lock().await;
        if let Some(mut old) = link.take() {
            debug!("Dropping previous link to {}", old.id);
            old.abort_notifications();
            if let Err(e) = old.peripheral.disconnect().await {
                debug!("Previous peripheral disconnect failed: {}", e);
            }
        }

        let peripheral = find_peripheral_by_identifier(&self.adapter, id)
            .await?
            .ok_or_else(|| Error::device_not_found(id))?;

        info!("Connecting to device...");
        timeout(self.config.connection_timeout, peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", self.config.connection_timeout))??;

        info!("Discovering services...");
        timeout(self.config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| {
                Error::timeout("discover services", self.config.discovery_timeout)
            })??;

        let mut characteristics = HashMap::new();
        for service in peripheral.services() {
            debug!("  Service: {}", service.uuid);
            for characteristic in service.characteristics {
                debug!("    Characteristic: {}", characteristic.uuid);
                characteristics.insert((service.uuid, characteristic.uuid), characteristic);
            }
        }
        info!(
            "Connected, cached {} characteristics",
            characteristics.len()
        );

        *link = Some(Link {
            id: id.to_string(),
            peripheral,
            characteristics,
            notification_handles: Vec::new(),
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(mut link) = self.link.lock().await.take() else {
            return Ok(());
        };
        info!("Disconnecting from {}...", link.id);
        link.abort_notifications();
        link.peripheral.disconnect().await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let peripheral = match self.link.lock().await.as_ref() {
            Some(link) => link.peripheral.clone(),
            None => return false,
        };
        peripheral.is_connected().await.unwrap_or(false)
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        let (peripheral, found) = self.characteristic(service, characteristic).await?;
        timeout(
            self.config.write_timeout,
            peripheral.write(&found, payload, write_type),
        )
        .await
        .map_err(|_| {
            Error::timeout(
                format!("write characteristic {}", characteristic),
                self.config.write_timeout,
            )
        })??;
        Ok(())
    }

    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
        on_notify: NotificationCallback,
    ) -> Result<()> {
        let (peripheral, found) = self.characteristic(service, characteristic).await?;
        peripheral.subscribe(&found).await?;

        let mut stream = peripheral.notifications().await?;
        let char_uuid = found.uuid;
        let handle = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid == char_uuid {
                    on_notify(&notification.value);
                }
            }
        });

        match self.link.lock().await.as_mut() {
            Some(link) => link.notification_handles.push(handle),
            // Link dropped while subscribing.
            None => handle.abort(),
        }
        Ok(())
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        let Some(mut link) = self.link.get_mut().take() else {
            return;
        };
        warn!(
            device = %link.id,
            "BleTransport dropped with an open link - performing best-effort disconnect"
        );
        link.abort_notifications();

        let peripheral = link.peripheral;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = peripheral.disconnect().await {
                    debug!(error = %e, "Best-effort disconnect failed");
                }
            });
        }
    }
}
