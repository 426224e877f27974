//! Platform-agnostic protocol types for LightPlay BLE light toys.
//!
//! This crate holds everything about the LightPlay wire protocol that does
//! not need a Bluetooth stack: port and color identifiers, the byte tables
//! that drive the lamps, and the fixed 9-byte [`CommandFrame`].
//!
//! # Example
//!
//! ```
//! use lightplay_types::{Color, CommandFrame, Port};
//!
//! let frame = CommandFrame::fade_to(Port::Light1, Color::Blue);
//! assert_eq!(frame.as_bytes(), &[74, 0, 0, 0, 0, 15, 255, 0, 0]);
//! ```

pub mod error;
pub mod frame;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use frame::{CommandFrame, FRAME_LEN, Operation, PAYLOAD_LEN, color_bytes, port_byte};
pub use types::{Color, ColorChoice, LIGHT_COUNT, LightState, LightStatus, Port, Transition};
pub use uuid as uuids;
