//! # Configuration Loader
//!
//! Reads the tool's TOML file and deserializes it into `Config`. A missing
//! file is not an error: the defaults already describe the well-known DBWIN
//! names and a 400 ms wait, so the tool runs unconfigured.

use std::{fs, path::Path};

use log::Level;

use crate::capture_log;
use crate::config::model::{Config, ConfigError};

/// Load and parse the configuration from `path`, falling back to defaults
/// when the file does not exist.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    capture_log!(Level::Debug, "config", "reading config from {:?}", path);
    if !path.exists() {
        capture_log!(Level::Info, "config", "no config at {:?}, using defaults", path);
        return Ok(Config::default());
    }
    let txt = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&txt)?;
    capture_log!(Level::Info, "config", "loaded config from {:?}", path);
    Ok(cfg)
}
