//! # Configuration Management
//!
//! Server configuration loaded from a JSON file. Every section is optional and
//! falls back to built-in defaults; unknown keys are ignored so older config
//! files keep loading.
//!
//! ```json
//! {
//!   "server":  { "port": 9090, "host": "0.0.0.0", "debugMode": false },
//!   "storage": { "uploadDir": "./uploads", "logDir": "./logs" },
//!   "version": { "initialVersion": "1.0.0", "rejectDuplicates": false },
//!   "limits":  { "maxUploadSizeMb": 32 },
//!   "apps":    [ { "id": "launcher", "name": "Launcher", "description": "" } ]
//! }
//! ```
//!
//! Command line flags and environment variables override file values; see
//! [`ConfigOverrides`].
//!
//! ```rust,no_run
//! use hotupdate_server::config::Config;
//!
//! // Load from file with fallback to defaults
//! let config = Config::load_or_default("config.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub version: VersionConfig,
    pub limits: LimitsConfig,
    /// Apps provisioned at startup in addition to the built-in `default` app.
    pub apps: Vec<PredefinedApp>,
}

/// Network settings for the HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Lowers the default log level to `debug`.
    pub debug_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9090,
            host: "0.0.0.0".to_string(),
            debug_mode: false,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    /// Root of the registries and packages.
    pub upload_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

/// Versioning policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VersionConfig {
    /// Id given to the first version of every new app.
    pub initial_version: String,
    pub initial_version_name: String,
    pub initial_version_description: String,
    /// Refuse to publish a version id that already exists for the app.
    pub reject_duplicates: bool,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            initial_version: "1.0.0".to_string(),
            initial_version_name: "Initial version".to_string(),
            initial_version_description: "Initial release".to_string(),
            reject_duplicates: false,
        }
    }
}

/// Upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitsConfig {
    pub max_upload_size_mb: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_size_mb: 32,
        }
    }
}

/// An app declared in the config file and created by bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredefinedApp {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Values supplied on the command line or through the environment.
///
/// `None` leaves the loaded value untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub upload_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub debug_mode: Option<bool>,
}

impl Config {
    /// Loads configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config_str = fs::read_to_string(path)?;
        let config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    /// Loads configuration from a file, or uses defaults when the file is absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies command line and environment values on top of the loaded file.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(upload_dir) = overrides.upload_dir {
            self.storage.upload_dir = upload_dir;
        }
        if let Some(log_dir) = overrides.log_dir {
            self.storage.log_dir = log_dir;
        }
        if let Some(debug_mode) = overrides.debug_mode {
            self.server.debug_mode = debug_mode;
        }
    }

    /// Maximum accepted request body in bytes.
    pub fn max_upload_size_bytes(&self) -> usize {
        self.limits.max_upload_size_mb.saturating_mul(1024 * 1024)
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
