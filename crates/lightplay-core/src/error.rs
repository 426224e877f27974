//! Error types for lightplay-core.
//!
//! Most failures on the send path are deliberately *not* errors: a command
//! issued while disconnected, or dropped by the rate limiter, completes
//! successfully as a no-op and is only visible through
//! [`crate::SendMetrics`]. What remains here is what a caller can act on.
//!
//! | Error Type | Raised by | Notes |
//! |------------|-----------|-------|
//! | [`Error::Bluetooth`] | transport | Passed through unmodified |
//! | [`Error::WriteFailed`] | transport write | Cache is left untouched |
//! | [`Error::DeviceNotFound`] | scan / connect | Session returns to disconnected |
//! | [`Error::ConnectionFailed`] | connect | Session returns to disconnected |
//! | [`Error::Timeout`] | transport | Connect, discovery or write timed out |
//! | [`Error::InvalidArgument`] | parsing | Unknown port or color name |
//! | [`Error::InvalidConfig`] | config | Zero rate, zero pacing, and so on |

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to a LightPlay device.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation requires a link but none is held.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// A port or color identifier could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Connection failed.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The peripheral identifier that failed to connect.
        device_id: Option<String>,
        /// Description of the failure.
        reason: String,
    },

    /// Write operation failed.
    #[error("Write failed to characteristic {uuid}: {reason}")]
    WriteFailed {
        /// The characteristic UUID.
        uuid: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reason why a device was not found.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// The scan finished without seeing any LightPlay peripheral.
    NoDevicesInRange,
    /// No discovered peripheral matched the identifier.
    NotFound { identifier: String },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDevicesInRange => write!(f, "no LightPlay devices in range"),
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a connection failure.
    pub fn connection_failed(device_id: Option<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            device_id,
            reason: reason.into(),
        }
    }

    /// Create a write failure.
    pub fn write_failed(uuid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            uuid: uuid.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<lightplay_types::ParseError> for Error {
    fn from(err: lightplay_types::ParseError) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}

/// Result type alias using lightplay-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
