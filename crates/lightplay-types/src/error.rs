//! Error types for parsing in lightplay-types.

use thiserror::Error;

/// Errors that can occur when parsing LightPlay protocol values.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in lightplay-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The name does not identify a port.
    #[error("Unknown port: '{0}' (expected 1, 2, 3 or all)")]
    UnknownPort(String),

    /// The name does not identify a palette color.
    #[error("Unknown color: '{0}'")]
    UnknownColor(String),

    /// A byte sequence is not a well-formed command frame.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

/// Result type alias using lightplay-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
