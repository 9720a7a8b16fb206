//! # Configuration
//!
//! Settings are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. `invigil.toml` (or the file given with `--config`)
//! 3. environment: `INVIGIL_HOST`, `INVIGIL_PORT`, `INVIGIL_OWNER`,
//!    `INVIGIL_QUIET_MS`
//! 4. CLI flags
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [storage]
//! backend = "file"        # or "redb"
//! path = "invigil-data"   # directory (file) or database file (redb)
//! owner_key = "default"
//!
//! [persistence]
//! quiet_period_ms = 1500
//! ```

use invigil_core::primitives::{DEFAULT_OWNER_KEY, DEFAULT_QUIET_PERIOD_MS};
use invigil_core::storage::validate_owner_key;
use invigil_core::{FileSnapshotStore, InvigilError, RedbSnapshotStore, SnapshotStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "invigil.toml";

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Storage backend for snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON document per owner in a directory.
    #[default]
    File,
    /// Embedded redb database.
    Redb,
}

impl std::str::FromStr for Backend {
    type Err = InvigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "redb" => Ok(Backend::Redb),
            _ => Err(InvigilError::InvalidValue {
                field: "backend",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Backend::File => "file",
            Backend::Redb => "redb",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    pub path: PathBuf,
    pub owner_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::File,
            path: PathBuf::from("invigil-data"),
            owner_key: DEFAULT_OWNER_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub quiet_period_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Parse TOML text. Missing sections and keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, InvigilError> {
        toml::from_str(text).map_err(|e| InvigilError::InvalidValue {
            field: "config",
            value: e.to_string(),
        })
    }

    /// Load from `path`, or from `invigil.toml` if it exists, or defaults.
    /// Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, InvigilError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::read_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, InvigilError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            InvigilError::Persistence(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Self::from_toml_str(&text)
    }

    /// Apply `INVIGIL_*` overrides using `lookup` to read variables.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), InvigilError> {
        if let Some(host) = lookup("INVIGIL_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("INVIGIL_PORT") {
            self.server.port = port.trim().parse().map_err(|_| InvigilError::InvalidValue {
                field: "INVIGIL_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(owner) = lookup("INVIGIL_OWNER") {
            self.storage.owner_key = owner;
        }
        if let Some(quiet) = lookup("INVIGIL_QUIET_MS") {
            self.persistence.quiet_period_ms =
                quiet.trim().parse().map_err(|_| InvigilError::InvalidValue {
                    field: "INVIGIL_QUIET_MS",
                    value: quiet.clone(),
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), InvigilError> {
        validate_owner_key(&self.storage.owner_key)
    }

    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.persistence.quiet_period_ms)
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Open the configured snapshot store.
    pub fn open_store(&self) -> Result<Arc<dyn SnapshotStore>, InvigilError> {
        let store: Arc<dyn SnapshotStore> = match self.storage.backend {
            Backend::File => Arc::new(FileSnapshotStore::open(&self.storage.path)?),
            Backend::Redb => {
                if let Some(parent) = self.storage.path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| InvigilError::Persistence(e.to_string()))?;
                }
                Arc::new(RedbSnapshotStore::open(&self.storage.path)?)
            }
        };
        tracing::debug!(backend = %self.storage.backend, path = %self.storage.path.display(), "snapshot store opened");
        Ok(store)
    }
}
