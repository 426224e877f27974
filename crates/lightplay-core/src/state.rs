//! Last-known light state.
//!
//! The cache mirrors what the session believes each of the three lights is
//! showing. It is consulted before every command so that commands which would
//! not change anything are never sent, and it is updated only after a write
//! succeeds.
//!
//! [`Port::AllLights`] has no record of its own. Reads through it aggregate
//! the three lights and report `None` ("mixed") unless they all agree; writes
//! through it update all three records together.
//!
//! A fade leaves a light `Fading` until the configured fade duration has
//! passed; [`LightStateCache::settle`] then records it as `On`.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use lightplay_types::{
    Color, ColorChoice, CommandFrame, LIGHT_COUNT, LightState, LightStatus, Port, Transition,
};

/// What a command wants a port to look like afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Show `color`, immediately or by fading.
    Lit {
        /// Target color.
        color: Color,
        /// How to get there.
        transition: Transition,
    },
    /// Go dark, immediately or by fading.
    Dark {
        /// How to get there.
        transition: Transition,
    },
}

impl Intent {
    /// Frame that carries this intent to `port`.
    pub fn frame(self, port: Port) -> CommandFrame {
        match self {
            Intent::Lit { color, transition } => CommandFrame::lit(port, color, transition),
            Intent::Dark { transition } => CommandFrame::dark(port, transition),
        }
    }
}

use crate::session::DEFAULT_FADE_DURATION;

/// Fixed record of the three lights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightStateCache {
    lights: [LightState; LIGHT_COUNT],
    /// When each light's fade in progress completes.
    fade_ends: [Option<Instant>; LIGHT_COUNT],
    fade_duration: Duration,
}

impl Default for LightStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LightStateCache {
    /// All lights off and white, with the default fade duration.
    pub fn new() -> Self {
        Self::with_fade_duration(DEFAULT_FADE_DURATION)
    }

    /// All lights off and white; fades complete after `fade_duration`.
    pub fn with_fade_duration(fade_duration: Duration) -> Self {
        Self {
            lights: [LightState::INITIAL; LIGHT_COUNT],
            fade_ends: [None; LIGHT_COUNT],
            fade_duration,
        }
    }

    /// Forget everything, as after the device was reset.
    pub fn reset(&mut self) {
        self.lights = [LightState::INITIAL; LIGHT_COUNT];
        self.fade_ends = [None; LIGHT_COUNT];
    }

    /// Record fades that have run their course as `On`.
    pub fn settle(&mut self) {
        self.settle_at(Instant::now());
    }

    /// [`settle`](Self::settle) against an explicit clock reading.
    pub fn settle_at(&mut self, now: Instant) {
        for (light, fade_end) in self.lights.iter_mut().zip(self.fade_ends.iter_mut()) {
            if fade_end.is_some_and(|end| end <= now) {
                light.status = LightStatus::On;
                *fade_end = None;
            }
        }
    }

    /// Cached state of a single light, or `None` for [`Port::AllLights`]
    /// when the lights disagree.
    pub fn state_of(&self, port: Port) -> Option<LightState> {
        match port.index() {
            Some(i) => Some(self.lights[i]),
            None => {
                let first = self.lights[0];
                self.lights.iter().all(|l| *l == first).then_some(first)
            }
        }
    }

    /// Status of `port`; `None` means the lights disagree.
    pub fn status_of(&self, port: Port) -> Option<LightStatus> {
        self.aggregate(port, |light| light.status)
    }

    /// Color of `port`; `None` means the lights disagree.
    pub fn color_of(&self, port: Port) -> Option<Color> {
        self.aggregate(port, |light| light.color)
    }

    fn aggregate<T: PartialEq>(&self, port: Port, field: impl Fn(&LightState) -> T) -> Option<T> {
        match port.index() {
            Some(i) => Some(field(&self.lights[i])),
            None => {
                let first = field(&self.lights[0]);
                self.lights[1..]
                    .iter()
                    .all(|light| field(light) == first)
                    .then_some(first)
            }
        }
    }

    /// Record a light (or all lights) as on with `color`.
    pub fn apply_on(&mut self, port: Port, color: Color) {
        let state = LightState {
            status: LightStatus::On,
            color,
        };
        self.apply(port, state, None);
    }

    /// Record a light (or all lights) as fading to `color`, starting now.
    pub fn apply_fade_to(&mut self, port: Port, color: Color) {
        let state = LightState {
            status: LightStatus::Fading,
            color,
        };
        let end = Instant::now() + self.fade_duration;
        self.apply(port, state, Some(end));
    }

    /// Record a light (or all lights) as off. The color is kept.
    pub fn apply_off(&mut self, port: Port) {
        for (light, fade_end) in self.targets(port) {
            light.status = LightStatus::Off;
            *fade_end = None;
        }
    }

    /// Record the effect of a successfully sent intent.
    pub fn apply_intent(&mut self, port: Port, intent: Intent) {
        match intent {
            Intent::Lit {
                color,
                transition: Transition::Immediate,
            } => self.apply_on(port, color),
            Intent::Lit {
                color,
                transition: Transition::Fade,
            } => self.apply_fade_to(port, color),
            Intent::Dark { .. } => self.apply_off(port),
        }
    }

    fn apply(&mut self, port: Port, state: LightState, end: Option<Instant>) {
        for (light, fade_end) in self.targets(port) {
            *light = state;
            *fade_end = end;
        }
    }

    fn targets(
        &mut self,
        port: Port,
    ) -> impl Iterator<Item = (&mut LightState, &mut Option<Instant>)> {
        let range = match port.index() {
            Some(i) => i..i + 1,
            None => 0..LIGHT_COUNT,
        };
        self.lights[range.clone()]
            .iter_mut()
            .zip(self.fade_ends[range].iter_mut())
    }

    /// Whether sending `intent` to `port` would leave observable state as is.
    ///
    /// Lit intents are redundant when the port is already on with the same
    /// color. A fade is also redundant while the port is still fading to that
    /// color; an immediate set during the fade is not, since it cuts the fade
    /// short. Dark intents are redundant when the port is already off. A
    /// mixed aggregate is never redundant. Call [`settle`](Self::settle)
    /// first so finished fades count as on.
    pub fn is_redundant(&self, port: Port, intent: Intent) -> bool {
        match intent {
            Intent::Lit { color, transition } => {
                let lit = match self.status_of(port) {
                    Some(LightStatus::On) => true,
                    Some(LightStatus::Fading) => transition == Transition::Fade,
                    _ => false,
                };
                lit && self.color_of(port) == Some(color)
            }
            Intent::Dark { .. } => self.status_of(port) == Some(LightStatus::Off),
        }
    }

    /// Turn a requested color into a concrete one.
    ///
    /// `Surprise` draws uniformly from the palette, rejecting the port's
    /// current color. For [`Port::AllLights`] the first light stands in.
    pub fn resolve<R: Rng + ?Sized>(&self, port: Port, choice: ColorChoice, rng: &mut R) -> Color {
        match choice {
            ColorChoice::Color(color) => color,
            ColorChoice::Surprise => {
                let representative = port.index().unwrap_or(0);
                surprise_excluding(self.lights[representative].color, rng)
            }
        }
    }
}

/// Draw a palette color other than `current` by rejection sampling.
pub fn surprise_excluding<R: Rng + ?Sized>(current: Color, rng: &mut R) -> Color {
    loop {
        let candidate = Color::ALL[rng.random_range(0..Color::ALL.len())];
        if candidate != current {
            return candidate;
        }
    }
}
