//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use lightplay_core::{SessionConfig, WriteType};
use serde::{Deserialize, Serialize};

use crate::cli::DeviceArgs;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default device id or name
    #[serde(default)]
    pub device: Option<String>,

    /// Scan duration in seconds
    #[serde(default)]
    pub scan_secs: Option<u64>,

    /// Fade duration in milliseconds, written to the toy on connect
    #[serde(default)]
    pub fade_ms: Option<u64>,

    /// Delay after each command in milliseconds
    #[serde(default)]
    pub pacing_ms: Option<u64>,

    /// Rate limit for command frames
    #[serde(default)]
    pub max_sends_per_second: Option<u32>,

    /// Write frames without waiting for a response
    #[serde(default)]
    pub write_without_response: bool,
}

impl Config {
    /// Get the default config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lightplay")
            .join("config.toml")
    }

    /// Load config from `path`, or the default path.
    ///
    /// A missing default file yields the defaults. A missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Build the session config; command-line values win over the file.
    pub fn session_config(&self, args: &DeviceArgs) -> Result<SessionConfig> {
        let mut config = SessionConfig::new();

        if let Some(device) = args.device.as_ref().or(self.device.as_ref()) {
            config = config.device(device.clone());
        }
        if let Some(secs) = args.scan_secs.or(self.scan_secs) {
            config = config.scan_duration(Duration::from_secs(secs));
        }
        if let Some(ms) = self.fade_ms {
            config = config.fade_duration(Duration::from_millis(ms));
        }
        if let Some(ms) = self.pacing_ms {
            config = config.pacing_delay(Duration::from_millis(ms));
        }
        if let Some(rate) = self.max_sends_per_second {
            config = config.max_sends_per_second(rate);
        }
        if self.write_without_response {
            config = config.write_type(WriteType::WithoutResponse);
        }

        config.validate()?;
        Ok(config)
    }
}
