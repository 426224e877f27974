//! Command implementations for the CLI.

mod demo;
mod light;
mod scan;

pub use demo::cmd_demo;
pub use light::{LightCommand, cmd_light};
pub use scan::cmd_scan;
