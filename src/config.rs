use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Interface};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub interface: InterfaceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InterfaceConfig {
    /// Bare interface name or device path.
    pub name: String,
    /// Receive timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_timeout: Option<f64>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        self.interface
            .receive_timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    pub fn open(&self) -> Result<Interface, Error> {
        let mut iface = Interface::open(&self.interface.name)?;
        iface.set_timeout(self.receive_timeout());
        Ok(iface)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read the configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse the configuration file: {0}")]
    ParseError(#[from] toml::de::Error),
}
