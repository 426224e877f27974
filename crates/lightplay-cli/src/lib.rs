//! Command-line interface for LightPlay BLE light toys.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | List LightPlay toys in range |
//! | `on` | Set a light to a color |
//! | `off` | Turn a light off |
//! | `fade` | Fade a light to a color |
//! | `fade-off` | Fade a light out |
//! | `demo` | Cycle surprise colors across all lights |
//!
//! Ports are `1`, `2`, `3` or `all`. Colors are `white`, `red`, `orange`,
//! `yellow`, `green`, `blue`, `magenta`, or `surprise` for a random color
//! different from the one the light shows.
//!
//! # Configuration
//!
//! The CLI reads `~/.config/lightplay/config.toml` (or platform equivalent),
//! or the file given with `--config`. Command-line flags win over the file.
//!
//! ```toml
//! device = "LightPlay"
//! scan_secs = 5
//! fade_ms = 2000
//! pacing_ms = 300
//! max_sends_per_second = 20
//! write_without_response = false
//! ```
//!
//! # Environment Variables
//!
//! - `LIGHTPLAY_DEVICE`: Default device id or name (overridden by `--device`)
//! - `LIGHTPLAY_CONFIG`: Config file path (overridden by `--config`)
//! - `RUST_LOG`: Log filter when neither `-v` nor `-q` is given
//!
//! # Examples
//!
//! ```bash
//! lightplay scan
//! lightplay on 2 red
//! lightplay fade all surprise --device "LightPlay"
//! lightplay demo --cycles 5
//! ```

// Re-export core dependencies for convenience
pub use lightplay_core;
pub use lightplay_types;
