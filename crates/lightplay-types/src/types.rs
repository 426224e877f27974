//! Core types for addressing and coloring LightPlay lights.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Number of physically addressable lights on a LightPlay toy.
pub const LIGHT_COUNT: usize = 3;

/// Addressing unit selecting one light or all three.
///
/// `AllLights` is a selector only; it has no state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Port {
    /// First light.
    Light1,
    /// Second light.
    Light2,
    /// Third light.
    Light3,
    /// All three lights at once.
    AllLights,
}

impl Port {
    /// The individually addressable ports, in index order.
    pub const LIGHTS: [Port; LIGHT_COUNT] = [Port::Light1, Port::Light2, Port::Light3];

    /// Zero-based light index, or `None` for [`Port::AllLights`].
    #[must_use]
    pub fn index(self) -> Option<usize> {
        match self {
            Port::Light1 => Some(0),
            Port::Light2 => Some(1),
            Port::Light3 => Some(2),
            Port::AllLights => None,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Light1 => write!(f, "light 1"),
            Port::Light2 => write!(f, "light 2"),
            Port::Light3 => write!(f, "light 3"),
            Port::AllLights => write!(f, "all lights"),
        }
    }
}

impl FromStr for Port {
    type Err = ParseError;

    /// Parse a port name.
    ///
    /// # Examples
    ///
    /// ```
    /// use lightplay_types::Port;
    ///
    /// assert_eq!("2".parse::<Port>(), Ok(Port::Light2));
    /// assert_eq!("Light 3".parse::<Port>(), Ok(Port::Light3));
    /// assert_eq!("all".parse::<Port>(), Ok(Port::AllLights));
    /// assert!("4".parse::<Port>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "1" | "light1" => Ok(Port::Light1),
            "2" | "light2" => Ok(Port::Light2),
            "3" | "light3" => Ok(Port::Light3),
            "all" | "alllights" | "lights" => Ok(Port::AllLights),
            _ => Err(ParseError::UnknownPort(s.to_string())),
        }
    }
}

/// A concrete palette color.
///
/// Cached light state always holds one of these; the `Surprise` meta-color
/// lives in [`ColorChoice`] and is resolved before it can be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Color {
    /// White (the power-on color).
    #[default]
    White,
    /// Red.
    Red,
    /// Orange.
    Orange,
    /// Yellow.
    Yellow,
    /// Green.
    Green,
    /// Blue.
    Blue,
    /// Magenta.
    Magenta,
}

impl Color {
    /// Every concrete color, in palette order.
    pub const ALL: [Color; 7] = [
        Color::White,
        Color::Red,
        Color::Orange,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Magenta,
    ];

    /// Lowercase palette name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Red => "red",
            Color::Orange => "orange",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Magenta => "magenta",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Color::ALL
            .into_iter()
            .find(|color| color.name() == lower)
            .ok_or_else(|| ParseError::UnknownColor(s.to_string()))
    }
}

/// A color as requested by a caller: either a concrete color or `Surprise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ColorChoice {
    /// A specific palette color.
    Color(Color),
    /// A random color different from the light's current one.
    Surprise,
}

impl From<Color> for ColorChoice {
    fn from(color: Color) -> Self {
        ColorChoice::Color(color)
    }
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorChoice::Color(color) => color.fmt(f),
            ColorChoice::Surprise => write!(f, "surprise"),
        }
    }
}

impl FromStr for ColorChoice {
    type Err = ParseError;

    /// Parse a color name, including `surprise`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lightplay_types::{Color, ColorChoice};
    ///
    /// assert_eq!("Red".parse::<ColorChoice>(), Ok(ColorChoice::Color(Color::Red)));
    /// assert_eq!("surprise".parse::<ColorChoice>(), Ok(ColorChoice::Surprise));
    /// assert!("teal".parse::<ColorChoice>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("surprise") {
            return Ok(ColorChoice::Surprise);
        }
        s.parse::<Color>().map(ColorChoice::Color)
    }
}

/// On/off status of a single light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LightStatus {
    /// Light is dark.
    #[default]
    Off,
    /// Light shows its color.
    On,
    /// Light was told to fade to its color.
    Fading,
}

impl fmt::Display for LightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightStatus::Off => write!(f, "off"),
            LightStatus::On => write!(f, "on"),
            LightStatus::Fading => write!(f, "fading"),
        }
    }
}

/// How a light reaches its new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Transition {
    /// Change at once.
    #[default]
    Immediate,
    /// Fade over the session's configured fade duration.
    Fade,
}

/// Last-known state of one physical light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightState {
    /// On/off/fading status.
    pub status: LightStatus,
    /// Current (or target) color. Kept while the light is off.
    pub color: Color,
}

impl LightState {
    /// State of a light after power-on or device reset: off, white.
    pub const INITIAL: LightState = LightState {
        status: LightStatus::Off,
        color: Color::White,
    };
}
