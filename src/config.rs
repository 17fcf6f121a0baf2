//! Simulation configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `SLABSIM_*` environment variables. Command-line flags
//! are applied on top by the binary.

use crate::error::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one simulation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Object size in bytes; prompted for when absent
    pub object_size: Option<usize>,
    /// Colour menu and diagnostic output
    pub color: bool,
    /// Also emit status reports as JSON lines
    pub json_status: bool,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            object_size: None,
            color: true,
            json_status: false,
            log_level: "warn".to_string(),
        }
    }
}

impl SimConfig {
    /// Load configuration, reading `path` if given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("color", defaults.color)
            .and_then(|b| b.set_default("json_status", defaults.json_status))
            .and_then(|b| b.set_default("log_level", defaults.log_level))
            .map_err(|e| Error::Config(format!("Invalid defaults: {}", e)))?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix("SLABSIM").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.object_size == Some(0) {
            return Err(Error::InvalidArgument(
                "object size must be a positive number of bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}
