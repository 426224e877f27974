//! Command frame codec.
//!
//! Every command is a fixed 9-byte frame written to the RX characteristic:
//!
//! | Byte | Meaning |
//! |------|---------|
//! | 0 | port selector plus operation offset |
//! | 1-8 | color payload, or all zero for off |
//!
//! The selector is the port byte of the addressed port with the operation
//! offset added to it. The offsets are fixed by the device firmware.

use core::fmt;
use core::time::Duration;

use crate::error::{ParseError, ParseResult};
use crate::types::{Color, Port, Transition};

/// Length of every command frame in bytes.
pub const FRAME_LEN: usize = 9;

/// Length of a color payload in bytes.
pub const PAYLOAD_LEN: usize = 8;

/// Port byte for [`Port::AllLights`].
pub const PORT_ALL_LIGHTS: u8 = 64;
/// Port byte for [`Port::Light1`].
pub const PORT_LIGHT_1: u8 = 72;
/// Port byte for [`Port::Light2`].
pub const PORT_LIGHT_2: u8 = 80;
/// Port byte for [`Port::Light3`].
pub const PORT_LIGHT_3: u8 = 88;

/// Selector of the session configuration command that sets the fade time.
/// Format: `[SET_FADE_DURATION, ms_hi, ms_lo, 0, 0, 0, 0, 0, 0]`
pub const SET_FADE_DURATION: u8 = 0x01;

/// Operation encoded as an offset on the port byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    /// Immediate set (with a color payload) or off (with a zero payload).
    Immediate = 0,
    /// Fade to the payload color.
    FadeTo = 2,
    /// Fade to dark.
    FadeOff = 3,
}

impl Operation {
    /// Offset added to the port byte.
    #[must_use]
    pub fn offset(self) -> u8 {
        self as u8
    }

    /// Operation that lights a port with the given transition.
    #[must_use]
    pub fn lit(transition: Transition) -> Self {
        match transition {
            Transition::Immediate => Operation::Immediate,
            Transition::Fade => Operation::FadeTo,
        }
    }

    /// Operation that darkens a port with the given transition.
    #[must_use]
    pub fn dark(transition: Transition) -> Self {
        match transition {
            Transition::Immediate => Operation::Immediate,
            Transition::Fade => Operation::FadeOff,
        }
    }

    fn from_offset(offset: u8) -> Option<Self> {
        match offset {
            0 => Some(Operation::Immediate),
            2 => Some(Operation::FadeTo),
            3 => Some(Operation::FadeOff),
            _ => None,
        }
    }
}

/// Base selector byte for a port.
///
/// # Examples
///
/// ```
/// use lightplay_types::{Port, port_byte};
///
/// assert_eq!(port_byte(Port::Light2), 80);
/// assert_eq!(port_byte(Port::AllLights), 64);
/// ```
#[must_use]
pub fn port_byte(port: Port) -> u8 {
    match port {
        Port::Light1 => PORT_LIGHT_1,
        Port::Light2 => PORT_LIGHT_2,
        Port::Light3 => PORT_LIGHT_3,
        Port::AllLights => PORT_ALL_LIGHTS,
    }
}

/// Eight-byte payload that drives the lamp channels to `color`.
///
/// The bytes are sent exactly as tabled. They read as four byte pairs, one
/// per lamp driver channel, but the device's own interpretation is unknown.
#[must_use]
pub fn color_bytes(color: Color) -> [u8; PAYLOAD_LEN] {
    match color {
        Color::White => [0, 0, 0, 0, 0, 0, 15, 255],
        Color::Red => [15, 255, 0, 0, 0, 0, 0, 0],
        Color::Orange => [10, 240, 4, 176, 0, 0, 0, 0],
        Color::Yellow => [8, 52, 7, 108, 0, 0, 0, 0],
        Color::Green => [0, 0, 15, 255, 0, 0, 0, 0],
        Color::Blue => [0, 0, 0, 0, 15, 255, 0, 0],
        Color::Magenta => [7, 208, 0, 0, 11, 184, 0, 0],
    }
}

fn port_from_byte(byte: u8) -> Option<Port> {
    match byte {
        PORT_LIGHT_1 => Some(Port::Light1),
        PORT_LIGHT_2 => Some(Port::Light2),
        PORT_LIGHT_3 => Some(Port::Light3),
        PORT_ALL_LIGHTS => Some(Port::AllLights),
        _ => None,
    }
}

/// A single 9-byte command frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandFrame([u8; FRAME_LEN]);

impl CommandFrame {
    fn light(port: Port, operation: Operation, payload: [u8; PAYLOAD_LEN]) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = port_byte(port) + operation.offset();
        bytes[1..].copy_from_slice(&payload);
        Self(bytes)
    }

    /// Set `port` to `color` immediately.
    ///
    /// # Examples
    ///
    /// ```
    /// use lightplay_types::{Color, CommandFrame, Port};
    ///
    /// let frame = CommandFrame::set(Port::Light2, Color::Red);
    /// assert_eq!(frame.as_bytes(), &[80, 15, 255, 0, 0, 0, 0, 0, 0]);
    /// ```
    #[must_use]
    pub fn set(port: Port, color: Color) -> Self {
        Self::light(port, Operation::Immediate, color_bytes(color))
    }

    /// Turn `port` off immediately.
    #[must_use]
    pub fn off(port: Port) -> Self {
        Self::light(port, Operation::Immediate, [0; PAYLOAD_LEN])
    }

    /// Fade `port` to `color`.
    #[must_use]
    pub fn fade_to(port: Port, color: Color) -> Self {
        Self::light(port, Operation::FadeTo, color_bytes(color))
    }

    /// Fade `port` to dark.
    #[must_use]
    pub fn fade_off(port: Port) -> Self {
        Self::light(port, Operation::FadeOff, [0; PAYLOAD_LEN])
    }

    /// Frame lighting `port` with `color` using `transition`.
    #[must_use]
    pub fn lit(port: Port, color: Color, transition: Transition) -> Self {
        Self::light(port, Operation::lit(transition), color_bytes(color))
    }

    /// Frame darkening `port` using `transition`.
    #[must_use]
    pub fn dark(port: Port, transition: Transition) -> Self {
        Self::light(port, Operation::dark(transition), [0; PAYLOAD_LEN])
    }

    /// Reset frame sent when a session starts: every light off.
    #[must_use]
    pub fn reset() -> Self {
        Self::off(Port::AllLights)
    }

    /// Configure the fade time used by subsequent fade commands.
    ///
    /// The duration is sent in milliseconds, saturating at `u16::MAX`.
    #[must_use]
    pub fn fade_duration(duration: Duration) -> Self {
        let millis = u16::try_from(duration.as_millis()).unwrap_or(u16::MAX);
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = SET_FADE_DURATION;
        bytes[1..3].copy_from_slice(&millis.to_be_bytes());
        Self(bytes)
    }

    /// Parse and validate a frame received as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidFrame`] if the length is not 9, the
    /// selector is not a known port/operation or configuration command, or
    /// an off/fade-off frame carries a non-zero payload.
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        let bytes: [u8; FRAME_LEN] = data.try_into().map_err(|_| {
            ParseError::InvalidFrame(format!(
                "expected {} bytes, got {}",
                FRAME_LEN,
                data.len()
            ))
        })?;
        let frame = Self(bytes);

        if frame.selector() == SET_FADE_DURATION {
            return Ok(frame);
        }

        let (_, operation) = frame.target().ok_or_else(|| {
            ParseError::InvalidFrame(format!("unknown selector {}", frame.selector()))
        })?;

        if operation == Operation::FadeOff && frame.payload().iter().any(|&b| b != 0) {
            return Err(ParseError::InvalidFrame(
                "fade-off frame carries a payload".to_string(),
            ));
        }

        Ok(frame)
    }

    /// Raw bytes as written to the device.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Byte 0: port selector plus operation offset.
    #[must_use]
    pub fn selector(&self) -> u8 {
        self.0[0]
    }

    /// Bytes 1-8.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.0[1..]
    }

    /// Port and operation addressed by a light frame.
    ///
    /// Returns `None` for configuration frames.
    #[must_use]
    pub fn target(&self) -> Option<(Port, Operation)> {
        let selector = self.selector();
        // Port bytes are multiples of 8, offsets are below 8.
        let port = port_from_byte(selector & !0x07)?;
        let operation = Operation::from_offset(selector & 0x07)?;
        Some((port, operation))
    }

    /// Whether this frame darkens its port.
    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.target().is_some() && self.payload().iter().all(|&b| b == 0)
    }

    /// Palette color carried by the payload, if it matches one exactly.
    #[must_use]
    pub fn color(&self) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|&color| color_bytes(color)[..] == *self.payload())
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<CommandFrame> for Vec<u8> {
    fn from(frame: CommandFrame) -> Self {
        frame.0.to_vec()
    }
}

impl fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandFrame({})", self)
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}
