//! Wiring: file config → runtime pipeline config
//!
//! The CLI is only glue. Everything here resolves the secret, builds the
//! configured stores, and hands a [`Config`] to the pipelines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use cask_core::config::{FileConfig, RemoteStoreConfig};
use cask_core::{Remote, Secret, Store};
use cask_pipeline::Config;
use cask_store::{MemIndex, MemStore, ObjectStore, S3Config};

/// Read the config file if it exists; a missing default path just means
/// defaults.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let path = expand_tilde(path);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(FileConfig::default());
    }
    FileConfig::load(&path).with_context(|| format!("loading config {}", path.display()))
}

/// Install the global tracing subscriber. Logs go to stderr because stdout
/// carries pipeline output (keys or reassembled bytes).
pub fn init_tracing(config: &FileConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Secret resolution order: `--secret` flag / CASK_SECRET env, then the
/// config file.
pub fn resolve_secret(flag: Option<&str>, config: &FileConfig) -> Result<Secret> {
    let text = flag
        .map(str::to_owned)
        .or_else(|| config.secret.clone())
        .context("no secret configured: set CASK_SECRET, pass --secret, or add one to cask.toml (generate with 'cask secret new')")?;
    Ok(Secret::decode(&text)?)
}

/// Assemble the runtime config from the file config.
pub fn build_config(
    file: &FileConfig,
    secret: Secret,
    use_index: bool,
) -> Result<Config> {
    let local = build_local(file)?;
    let mut config = Config::new(secret, local);
    config.split_concurrency = file.split_concurrency;
    config.join_concurrency = file.join_concurrency;
    config.move_concurrency = file.move_concurrency;

    if let Some(remote_cfg) = &file.stores.remote {
        let remote = build_remote(remote_cfg)?;
        config = config.with_remote(remote);
        if use_index {
            config = config.with_index(Arc::new(MemIndex::new()));
        }
    }
    Ok(config)
}

fn build_local(file: &FileConfig) -> Result<Arc<dyn Store>> {
    let local = &file.stores.local;
    match local.kind.as_str() {
        "mem" => Ok(Arc::new(MemStore::new())),
        "fs" => {
            let root = expand_tilde(&local.path);
            std::fs::create_dir_all(&root)
                .with_context(|| format!("creating store dir {}", root.display()))?;
            Ok(Arc::new(ObjectStore::fs(&root)?))
        }
        other => bail!("unknown local store kind '{other}' (expected \"fs\" or \"mem\")"),
    }
}

fn build_remote(remote: &RemoteStoreConfig) -> Result<Arc<dyn Remote>> {
    match remote.kind.as_str() {
        "mem" => Ok(Arc::new(ObjectStore::memory()?)),
        "s3" => {
            let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
                .or_else(|_| std::env::var("CASK_ACCESS_KEY_ID"))
                .context("S3 credentials not set: export AWS_ACCESS_KEY_ID")?;
            let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
                .or_else(|_| std::env::var("CASK_SECRET_ACCESS_KEY"))
                .context("AWS_SECRET_ACCESS_KEY not set")?;
            let store = ObjectStore::s3(
                &S3Config {
                    endpoint: remote.endpoint.clone(),
                    region: remote.region.clone(),
                    bucket: remote.bucket.clone(),
                    access_key_id,
                    secret_access_key,
                    enforce_tls: remote.enforce_tls,
                },
                &remote.prefix,
            )?;
            Ok(Arc::new(store))
        }
        other => bail!("unknown remote store kind '{other}' (expected \"s3\" or \"mem\")"),
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_secret_prefers_the_flag() {
        let generated = Secret::generate();
        let mut config = FileConfig::default();
        config.secret = Some(Secret::generate().encode());

        let resolved = resolve_secret(Some(&generated.encode()), &config).unwrap();
        assert_eq!(resolved.as_bytes(), generated.as_bytes());
    }

    #[test]
    fn resolve_secret_falls_back_to_config() {
        let generated = Secret::generate();
        let mut config = FileConfig::default();
        config.secret = Some(generated.encode());

        let resolved = resolve_secret(None, &config).unwrap();
        assert_eq!(resolved.as_bytes(), generated.as_bytes());
    }

    #[test]
    fn resolve_secret_without_any_source_fails() {
        let err = resolve_secret(None, &FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no secret configured"));
    }

    #[test]
    fn build_config_with_mem_stores() {
        let mut file = FileConfig::default();
        file.stores.local.kind = "mem".into();
        file.stores.remote = Some(RemoteStoreConfig {
            kind: "mem".into(),
            ..Default::default()
        });
        file.join_concurrency = 3;

        let config = build_config(&file, Secret::generate(), true).unwrap();
        assert_eq!(config.join_concurrency, 3);
        assert!(config.remote.is_some());
        assert!(config.index.is_some());
    }

    #[test]
    fn build_config_without_index() {
        let mut file = FileConfig::default();
        file.stores.local.kind = "mem".into();
        file.stores.remote = Some(RemoteStoreConfig {
            kind: "mem".into(),
            ..Default::default()
        });

        let config = build_config(&file, Secret::generate(), false).unwrap();
        assert!(config.index.is_none());
    }

    #[test]
    fn unknown_store_kind_is_rejected() {
        let mut file = FileConfig::default();
        file.stores.local.kind = "bolt".into();
        assert!(build_config(&file, Secret::generate(), false).is_err());
    }

    #[test]
    fn fs_local_store_builds_under_a_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = FileConfig::default();
        file.stores.local.path = dir.path().join("store");
        let config = build_config(&file, Secret::generate(), false).unwrap();
        assert!(config.remote.is_none());
    }
}
