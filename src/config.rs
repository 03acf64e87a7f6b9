//! Server configuration
//!
//! Loaded from a JSON file; every field has a default so a missing or partial
//! config is usable out of the box.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// univault server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root data directory (schemas, archives, registry)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Host to bind to (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8484)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means permissive (development)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Root directory for the remote archive store.
    /// Defaults to `<data_dir>/remote` when unset.
    #[serde(default)]
    pub remote_dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./univault-data")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8484
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            remote_dir: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Write configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Effective remote store root
    pub fn remote_root(&self) -> PathBuf {
        self.remote_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("remote"))
    }
}
