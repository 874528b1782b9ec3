use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::capture::slot::{SlotNames, DEFAULT_WAIT_TIMEOUT};

/// Top-level runtime config. Every field is defaulted so an absent or empty
/// TOML file yields a working configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]            pub enable_file: bool,
    #[serde(default)]            pub file:        Option<String>,
    #[serde(default = "default_level")] pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable_file: false, file: None, level: default_level() }
    }
}

fn default_level() -> String { "INFO".into() }

/// Mirror of the `[capture]` table. The names exist so a test or a second
/// isolated reader can point at private objects instead of the global
/// well-known ones.
#[derive(Debug, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_section")]      pub slot_section: String,
    #[serde(default = "default_buffer_ready")] pub buffer_ready: String,
    #[serde(default = "default_data_ready")]   pub data_ready:   String,
    /// Bound on one DataReady wait, humantime syntax ("400ms").
    #[serde(default = "default_wait")]         pub wait_timeout: String,
    /// Channels to enable at startup.
    #[serde(default = "default_true")]         pub kernel:       bool,
    #[serde(default = "default_true")]         pub legacy:       bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            slot_section: default_section(),
            buffer_ready: default_buffer_ready(),
            data_ready: default_data_ready(),
            wait_timeout: default_wait(),
            kernel: true,
            legacy: true,
        }
    }
}

fn default_section() -> String { SlotNames::default().section }
fn default_buffer_ready() -> String { SlotNames::default().buffer_ready }
fn default_data_ready() -> String { SlotNames::default().data_ready }
fn default_wait() -> String { format!("{}ms", DEFAULT_WAIT_TIMEOUT.as_millis()) }
fn default_true() -> bool { true }

impl CaptureConfig {
    pub fn slot_names(&self) -> SlotNames {
        SlotNames {
            section: self.slot_section.clone(),
            buffer_ready: self.buffer_ready.clone(),
            data_ready: self.data_ready.clone(),
        }
    }

    pub fn wait_timeout(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(&self.wait_timeout)
            .map_err(|e| ConfigError::InvalidDuration(self.wait_timeout.clone(), e))
    }
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
