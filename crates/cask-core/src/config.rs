//! File configuration (loaded from cask.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CaskResult, Error};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
    /// Base-64 secret. Prefer the CASK_SECRET environment variable; a secret
    /// kept here makes the file's permissions matter (see
    /// [`FileConfig::load`]).
    pub secret: Option<String>,
    /// Bound on split fan-out
    pub split_concurrency: usize,
    /// Bound on join fan-out
    pub join_concurrency: usize,
    /// Bound on move fan-out
    pub move_concurrency: usize,
    pub stores: StoresConfig,
}

/// The store roles: a local put/get source and an optional remote that moves
/// target and joins fall back to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoresConfig {
    pub local: LocalStoreConfig,
    pub remote: Option<RemoteStoreConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStoreConfig {
    /// "fs" or "mem"
    pub kind: String,
    /// Root directory for the fs store
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStoreConfig {
    /// "s3" or "mem"
    pub kind: String,
    /// S3-compatible endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    pub bucket: String,
    /// Object name prefix chunks are stored under
    pub prefix: String,
    /// Refuse plaintext-HTTP endpoints instead of warning
    pub enforce_tls: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_format: "text".into(),
            secret: None,
            split_concurrency: 64,
            join_concurrency: 10,
            move_concurrency: 64,
            stores: StoresConfig::default(),
        }
    }
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            kind: "fs".into(),
            path: PathBuf::from("~/.local/share/cask/store"),
        }
    }
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            kind: "s3".into(),
            endpoint: "http://localhost:9000".into(),
            region: "us-east-1".into(),
            bucket: "cask".into(),
            prefix: "chunks".into(),
            enforce_tls: false,
        }
    }
}

impl FileConfig {
    /// Load and parse a config file. Warns when the file both carries a
    /// secret and is readable by other users.
    pub fn load(path: &Path) -> CaskResult<FileConfig> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let config: FileConfig = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;

        #[cfg(unix)]
        if config.secret.is_some() {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(path) {
                if meta.permissions().mode() & 0o044 != 0 {
                    tracing::warn!(
                        path = %path.display(),
                        "config file holds a secret but is readable by other users; chmod 600 it"
                    );
                }
            }
        }

        Ok(config)
    }
}
