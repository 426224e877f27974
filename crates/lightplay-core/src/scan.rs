//! Device discovery and scanning.
//!
//! This module provides the btleplug side of discovery: finding the
//! adapter, running a service-filtered scan and matching peripherals
//! against an identifier.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::util::{create_identifier, format_peripheral_id};
use crate::uuids::LIGHTPLAY_SERVICE;

/// Information about a discovered LightPlay peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLight {
    /// Connection identifier (peripheral ID on macOS, address elsewhere).
    pub id: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
}

impl DiscoveredLight {
    /// Create a discovered peripheral record.
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            rssi: None,
        }
    }

    /// Whether `identifier` names this peripheral.
    ///
    /// Matches the id exactly (case-insensitive, `:` ignored) or the name
    /// partially.
    pub fn matches(&self, identifier: &str) -> bool {
        let wanted = identifier.to_lowercase();
        let id = self.id.to_lowercase();
        if id == wanted || id.replace(':', "") == wanted.replace(':', "") {
            return true;
        }
        self.name
            .as_ref()
            .is_some_and(|name| name.to_lowercase().contains(&wanted))
    }

    /// Name for display, falling back to the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Service UUID the scan is restricted to.
    pub service: Uuid,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            service: LIGHTPLAY_SERVICE,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    #[must_use]
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan for LightPlay peripherals using a specific adapter.
///
/// An empty list indicates no devices were found (not an error).
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: &ScanOptions,
) -> Result<Vec<DiscoveredLight>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    let filter = ScanFilter {
        services: vec![options.service],
    };
    adapter.start_scan(filter).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    let mut discovered = Vec::new();

    for peripheral in peripherals {
        match process_peripheral(&peripheral, options.service).await {
            Ok(Some(light)) => {
                info!("Found LightPlay device: {}", light.label());
                discovered.push(light);
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
            }
        }
    }

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

async fn process_peripheral(
    peripheral: &Peripheral,
    service: Uuid,
) -> Result<Option<DiscoveredLight>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    // Some platforms ignore the scan filter, so check again here.
    if !advertises_service(&properties, service) {
        return Ok(None);
    }

    let id = create_identifier(&properties.address.to_string(), &peripheral.id());
    Ok(Some(DiscoveredLight {
        id,
        name: properties.local_name.clone(),
        rssi: properties.rssi,
    }))
}

fn advertises_service(properties: &PeripheralProperties, service: Uuid) -> bool {
    properties.services.contains(&service) || properties.service_data.contains_key(&service)
}

/// Search the adapter's known peripherals for one matching `identifier`.
pub async fn find_peripheral_by_identifier(
    adapter: &Adapter,
    identifier: &str,
) -> Result<Option<Peripheral>> {
    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        let candidate = DiscoveredLight {
            id: create_identifier(&props.address.to_string(), &peripheral.id()),
            name: props.local_name.clone(),
            rssi: props.rssi,
        };
        if candidate.matches(identifier)
            || format_peripheral_id(&peripheral.id()).eq_ignore_ascii_case(identifier)
        {
            debug!("Matched peripheral {}", candidate.label());
            return Ok(Some(peripheral));
        }
    }

    Ok(None)
}
