use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_CORRECTION: f64 = 0.1;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreSetting {
    /// Store living inside this process
    Memory,
    /// Store reached over the network
    Remote {
        address: SocketAddr,
        /// Per request timeout in milliseconds
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Default for StoreSetting {
    fn default() -> Self {
        StoreSetting::Memory
    }
}

impl StoreSetting {
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            StoreSetting::Memory => None,
            StoreSetting::Remote { timeout_ms, .. } => Some(Duration::from_millis(*timeout_ms)),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_correction() -> f64 {
    DEFAULT_CORRECTION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Prefix for every key owned by the classifier
    pub namespace: String,
    /// Substitute count for tokens a label has never seen
    #[serde(default = "default_correction")]
    pub correction: f64,
    #[serde(default)]
    pub store: StoreSetting,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: String::new(),
            correction: DEFAULT_CORRECTION,
            store: StoreSetting::default(),
        }
    }
}

impl Config {
    /// Default configuration for local development against a server on the loopback interface
    pub fn development() -> Config {
        Config {
            namespace: "tally:".into(),
            store: StoreSetting::Remote {
                address: SocketAddr::from(([127, 0, 0, 1], 7400)),
                timeout_ms: DEFAULT_TIMEOUT_MS,
            },
            ..Default::default()
        }
    }

    /// Test configuration. Used for in-memory
    pub fn testing() -> Config {
        Config {
            namespace: "tally-test:".into(),
            ..Default::default()
        }
    }

    pub fn from_toml(content: &str) -> Result<Config, Error> {
        toml::from_str(content).map_err(Error::from)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let content = std::fs::read_to_string(path)?;
        Config::from_toml(&content)
    }
}
