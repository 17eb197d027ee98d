use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{NsyncError, NsyncResult};

/// Top-level configuration (loaded from nsync.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NsyncConfig {
    pub log: LogConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub crypto: CryptoConfig,
}

impl NsyncConfig {
    /// Parse a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> NsyncResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| NsyncError::Config(format!("parsing {}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Cloud storage backend used by the OpenDAL client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// "fs", "s3", "webdav" or "memory"
    pub backend: String,
    /// S3 / WebDAV endpoint URL
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// S3 bucket name
    pub bucket: String,
    /// Root directory inside the backend (fs path, bucket prefix, or WebDAV path)
    pub root: String,
    /// Refuse plaintext HTTP endpoints instead of warning
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory holding repository.json and settings.json
    pub data_dir: PathBuf,
    /// Name of the encrypted repository blob in the cloud store
    pub cloud_file_name: String,
    /// Execution mode used when none is given: "gui", "semi" or "silent"
    pub default_mode: String,
}

/// Envelope parameters used when encrypting the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Application tag written at the start of every envelope
    pub package_name: String,
    /// Symmetric cipher name (default: xchacha20-poly1305)
    pub algorithm: String,
    /// Key derivation function name (default: argon2id)
    pub kdf: String,
    /// Compression codec applied before encryption; empty disables it
    pub compression: String,
    /// Argon2 cost tiers
    pub argon2: Argon2TiersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2TiersConfig {
    pub low: Argon2CostConfig,
    pub default: Argon2CostConfig,
    pub high: Argon2CostConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2CostConfig {
    /// Memory cost in KiB
    pub mem_cost_kib: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "fs".into(),
            endpoint: String::new(),
            region: "us-east-1".into(),
            bucket: "nsync".into(),
            root: "~/.local/share/nsync/cloud".into(),
            enforce_tls: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.local/share/nsync"),
            cloud_file_name: "nsync_repository.nsync".into(),
            default_mode: "gui".into(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            package_name: "nsync".into(),
            algorithm: "xchacha20-poly1305".into(),
            kdf: "argon2id".into(),
            compression: "zstd".into(),
            argon2: Argon2TiersConfig::default(),
        }
    }
}

impl Default for Argon2TiersConfig {
    fn default() -> Self {
        Self {
            // Transfer codes carry their own entropy, so the low tier stays light
            low: Argon2CostConfig {
                mem_cost_kib: 16384,
                time_cost: 2,
                parallelism: 1,
            },
            default: Argon2CostConfig {
                mem_cost_kib: 65536,
                time_cost: 3,
                parallelism: 4,
            },
            high: Argon2CostConfig {
                mem_cost_kib: 131072,
                time_cost: 4,
                parallelism: 4,
            },
        }
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}
