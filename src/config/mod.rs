//! SwitchV2P Configuration System
//!
//! Loads configuration from YAML files with a cascading priority system:
//! 1. `./switchv2p.yaml` (current directory - highest priority)
//! 2. `~/.switchv2p.yaml` (home directory)
//! 3. `~/.config/switchv2p/switchv2p.yaml` (user config directory)
//! 4. `/etc/switchv2p/switchv2p.yaml` (system - lowest priority)
//!
//! Values from higher priority files override those from lower priority files.
//!
//! # YAML Structure
//!
//! ```yaml
//! switch:
//!   role: tor
//!   id: 3
//!   gateways: ["132.68.0.3"]
//!   foreign_prefixes: ["133.68.0.0/16"]
//!   retransmit_timeout_ms: 8
//! cache:
//!   capacity: 8192
//! ports:
//!   - { id: 0, class: uplink, bind_addr: "127.0.0.1:7000", peer_addr: "127.0.0.1:7100" }
//! forwarding:
//!   routes: { "132.68.0.2": 0 }
//!   mirror_port: 0
//! ```

mod node;
mod port;
mod switch;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineConfig;

pub use node::NodeConfig;
pub use port::{ForwardingConfig, PortConfig};
pub use switch::{CacheConfig, SwitchConfig};

/// Default config filename.
const CONFIG_FILENAME: &str = "switchv2p.yaml";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Switch identity and coherence settings (`switch.*`).
    #[serde(default)]
    pub switch: SwitchConfig,

    /// Cache sizing (`cache.*`).
    #[serde(default)]
    pub cache: CacheConfig,

    /// Switch ports (`ports`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortConfig>,

    /// Static forwarding table (`forwarding.*`).
    #[serde(default, skip_serializing_if = "ForwardingConfig::is_empty")]
    pub forwarding: ForwardingConfig,

    /// Daemon runtime settings (`node.*`).
    #[serde(default)]
    pub node: NodeConfig,
}

impl Config {
    /// Create a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the standard search paths.
    ///
    /// Returns a tuple of (config, paths_loaded) where paths_loaded contains
    /// the paths that were successfully loaded.
    pub fn load() -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let search_paths = Self::search_paths();
        Self::load_from_paths(&search_paths)
    }

    /// Load configuration from specific paths.
    ///
    /// Paths are processed in order, with later paths overriding earlier ones.
    pub fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let mut config = Config::default();
        let mut loaded_paths = Vec::new();

        for path in paths {
            if path.exists() {
                let file_config = Self::load_file(path)?;
                config.merge(file_config);
                loaded_paths.push(path.clone());
            }
        }

        Ok((config, loaded_paths))
    }

    /// Load configuration from a single file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the standard search paths in priority order (lowest to highest).
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System config (lowest priority)
        paths.push(PathBuf::from("/etc/switchv2p").join(CONFIG_FILENAME));

        // User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("switchv2p").join(CONFIG_FILENAME));
        }

        // Home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".switchv2p.yaml"));
        }

        // Current directory (highest priority)
        paths.push(PathBuf::from(".").join(CONFIG_FILENAME));

        paths
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` when present.
    pub fn merge(&mut self, other: Config) {
        self.switch.merge(other.switch);
        self.cache.merge(other.cache);
        // Ports replace as a whole when non-empty
        if !other.ports.is_empty() {
            self.ports = other.ports;
        }
        self.forwarding.merge(other.forwarding);
        self.node.merge(other.node);
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity() == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be non-zero".into()));
        }
        if self.node.packet_channel == 0 {
            return Err(ConfigError::Invalid("node.packet_channel must be non-zero".into()));
        }

        let mut port_ids = HashSet::new();
        for port in &self.ports {
            if !port_ids.insert(port.id) {
                return Err(ConfigError::Invalid(format!("duplicate port id {}", port.id)));
            }
            for (field, value) in [("bind_addr", &port.bind_addr), ("peer_addr", &port.peer_addr)] {
                if value.parse::<SocketAddr>().is_err() {
                    return Err(ConfigError::Invalid(format!(
                        "port {}: invalid {} '{}'",
                        port.id, field, value
                    )));
                }
            }
        }

        for (dst, port) in &self.forwarding.routes {
            if !port_ids.contains(port) {
                return Err(ConfigError::Invalid(format!(
                    "route for {} names unknown port {}",
                    dst, port
                )));
            }
        }
        for (field, port) in [
            ("default_port", self.forwarding.default_port),
            ("mirror_port", self.forwarding.mirror_port),
        ] {
            if let Some(port) = port
                && !port_ids.contains(&port)
            {
                return Err(ConfigError::Invalid(format!(
                    "{} names unknown port {}",
                    field, port
                )));
            }
        }

        Ok(())
    }

    /// Engine construction parameters from the `switch` and `cache` sections.
    pub fn engine_config(&self) -> EngineConfig {
        let identity = self.switch.identity();
        EngineConfig::new(identity.role, identity.id)
            .with_policy(self.switch.resolved_policy())
            .with_gateways(self.switch.gateways.clone())
            .with_foreign_prefixes(self.switch.foreign_prefixes.clone())
            .with_capacity(self.cache.capacity())
            .with_second_chance(self.cache.second_chance())
            .with_retransmit_timeout(self.switch.retransmit_timeout())
    }

    /// Serialize this configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
