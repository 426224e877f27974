//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lightplay_types::{ColorChoice, Port};

#[derive(Parser)]
#[command(name = "lightplay")]
#[command(author, version, about = "CLI for LightPlay BLE light toys", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "LIGHTPLAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub device: DeviceArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device id or name, or use LIGHTPLAY_DEVICE env var
    #[arg(short, long, global = true, env = "LIGHTPLAY_DEVICE")]
    pub device: Option<String>,

    /// Scan duration in seconds
    #[arg(long, global = true)]
    pub scan_secs: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List LightPlay toys in range
    Scan,

    /// Set a light to a color (`surprise` picks a new random color)
    On {
        /// Light to address: 1, 2, 3 or all
        port: Port,
        /// Color name or `surprise`
        color: ColorChoice,
    },

    /// Turn a light off
    Off {
        /// Light to address: 1, 2, 3 or all
        port: Port,
    },

    /// Fade a light to a color
    Fade {
        /// Light to address: 1, 2, 3 or all
        port: Port,
        /// Color name or `surprise`
        color: ColorChoice,
    },

    /// Fade a light out
    FadeOff {
        /// Light to address: 1, 2, 3 or all
        port: Port,
    },

    /// Cycle surprise colors across all lights
    Demo {
        /// Number of rounds
        #[arg(short, long, default_value = "3")]
        cycles: u32,
    },
}
