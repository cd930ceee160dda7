//! Bridge configuration.
//!
//! ```toml
//! [[sinks]]
//! destination = "stderr"
//! channel = "error"
//!
//! [[sinks]]
//! destination = "recon.log"
//! channel = "all"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stir_engine::{ALL_CHANNELS, ERROR_CHANNEL, INFO_CHANNEL, WARNING_CHANNEL};

use crate::error::ConfigError;

/// Engine diagnostic channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    All,
    Info,
    Warning,
    Error,
}

impl Channel {
    /// Channel index understood by the engine
    pub const fn index(self) -> i32 {
        match self {
            Channel::All => ALL_CHANNELS,
            Channel::Info => INFO_CHANNEL,
            Channel::Warning => WARNING_CHANNEL,
            Channel::Error => ERROR_CHANNEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// `stdout`, `stderr`, `cout`, `cerr` or a file path
    pub destination: String,
    #[serde(default)]
    pub channel: Channel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn with_sink(mut self, destination: impl Into<String>, channel: Channel) -> Self {
        self.sinks.push(SinkConfig {
            destination: destination.into(),
            channel,
        });
        self
    }
}
