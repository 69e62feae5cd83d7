//! OpenDAL-backed chunk store
//!
//! One object per chunk, named `<prefix>/<base-64 key>`. The same type
//! serves the fs-backed local store, the S3-compatible remote, and the
//! in-memory service the test suites run against; only the operator behind
//! it changes.

use std::path::Path;

use async_trait::async_trait;
use futures::TryStreamExt;
use opendal::{ErrorKind, Operator};

use cask_core::{CaskResult, Error, Key, KeyWrite, Remote, Store};

/// S3-compatible endpoint configuration for the remote role.
///
/// Path-style addressing is the OpenDAL default and what MinIO/SeaweedFS
/// style endpoints expect.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Refuse plaintext-HTTP endpoints instead of warning.
    pub enforce_tls: bool,
}

/// A chunk store over any OpenDAL operator.
#[derive(Debug)]
pub struct ObjectStore {
    op: Operator,
    prefix: String,
}

impl ObjectStore {
    pub fn with_operator(op: Operator, prefix: &str) -> ObjectStore {
        ObjectStore {
            op,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    /// S3-compatible remote with retry and request logging layers.
    pub fn s3(cfg: &S3Config, prefix: &str) -> CaskResult<ObjectStore> {
        if cfg.endpoint.starts_with("http://") {
            if cfg.enforce_tls {
                return Err(Error::Config(format!(
                    "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled; \
                     use an HTTPS endpoint or disable enforce_tls for local development",
                    cfg.endpoint
                )));
            }
            tracing::warn!(
                endpoint = %cfg.endpoint,
                "S3 endpoint uses plaintext HTTP — chunks are sealed client-side, \
                 but credentials travel unencrypted"
            );
        }

        let builder = opendal::services::S3::default()
            .endpoint(&cfg.endpoint)
            .region(&cfg.region)
            .bucket(&cfg.bucket)
            .access_key_id(&cfg.access_key_id)
            .secret_access_key(&cfg.secret_access_key);

        let op = Operator::new(builder)
            .map_err(storage_err)?
            .layer(opendal::layers::LoggingLayer::default())
            .layer(
                opendal::layers::RetryLayer::new()
                    .with_max_times(5)
                    .with_jitter(),
            )
            .finish();

        Ok(ObjectStore::with_operator(op, prefix))
    }

    /// Local on-disk store rooted at `root`.
    pub fn fs(root: &Path) -> CaskResult<ObjectStore> {
        let builder = opendal::services::Fs::default().root(&root.to_string_lossy());
        let op = Operator::new(builder).map_err(storage_err)?.finish();
        Ok(ObjectStore::with_operator(op, ""))
    }

    /// Process-local store over the OpenDAL memory service. Enumerable, so
    /// it doubles as a hermetic remote in tests.
    pub fn memory() -> CaskResult<ObjectStore> {
        let op = Operator::new(opendal::services::Memory::default())
            .map_err(storage_err)?
            .finish();
        Ok(ObjectStore::with_operator(op, ""))
    }

    fn object_path(&self, key: &Key) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{key}", self.prefix)
        }
    }
}

fn storage_err(e: opendal::Error) -> Error {
    Error::Storage(e.to_string())
}

#[async_trait]
impl Store for ObjectStore {
    async fn put(&self, key: Key, chunk: Vec<u8>) -> CaskResult<()> {
        let path = self.object_path(&key);
        // Envelopes are deterministic per (secret, plaintext), so a racing
        // double-put writes identical bytes and exists-then-write is safe.
        match self.op.exists(&path).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => return Err(storage_err(e)),
        }
        self.op
            .write(&path, chunk)
            .await
            .map(|_| ())
            .map_err(storage_err)
    }

    async fn get(&self, key: &Key) -> CaskResult<Vec<u8>> {
        match self.op.read(&self.object_path(key)).await {
            Ok(buf) => Ok(buf.to_bytes().to_vec()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NoSuchKey(*key)),
            Err(e) => Err(storage_err(e)),
        }
    }
}

#[async_trait]
impl Remote for ObjectStore {
    async fn list_keys(&self, out: &mut (dyn KeyWrite + Send)) -> CaskResult<()> {
        let dir = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        };
        let mut lister = self.op.lister(&dir).await.map_err(storage_err)?;
        while let Some(entry) = lister.try_next().await.map_err(storage_err)? {
            // anything that does not decode to a 32-byte key is not a chunk
            match Key::decode(entry.name()) {
                Ok(key) => out.write_key(key)?,
                Err(_) => continue,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_core::MemKeys;

    #[tokio::test]
    async fn memory_put_get_roundtrip() {
        let store = ObjectStore::memory().unwrap();
        let key = Key::of(b"chunk");
        store.put(key, b"sealed bytes".to_vec()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), b"sealed bytes");
    }

    #[tokio::test]
    async fn memory_get_missing_is_no_such_key() {
        let store = ObjectStore::memory().unwrap();
        let err = store.get(&Key::of(b"absent")).await.unwrap_err();
        assert!(matches!(err, Error::NoSuchKey(_)));
    }

    #[tokio::test]
    async fn memory_put_is_idempotent() {
        let store = ObjectStore::memory().unwrap();
        let key = Key::of(b"chunk");
        store.put(key, b"first".to_vec()).await.unwrap();
        store.put(key, b"second".to_vec()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn memory_list_keys_skips_foreign_objects() {
        let store = ObjectStore::memory().unwrap();
        let key = Key::of(b"chunk");
        store.put(key, b"sealed".to_vec()).await.unwrap();
        // a name outside the key namespace must be ignored by enumeration
        store
            .op
            .write("not-a-key", b"junk".to_vec())
            .await
            .unwrap();

        let mut listed = MemKeys::new();
        store.list_keys(&mut listed).await.unwrap();
        assert_eq!(listed.keys(), &[key]);
    }

    #[tokio::test]
    async fn fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::fs(dir.path()).unwrap();
        let key = Key::of(b"on disk");
        store.put(key, b"sealed".to_vec()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), b"sealed");

        let mut listed = MemKeys::new();
        store.list_keys(&mut listed).await.unwrap();
        assert_eq!(listed.keys(), &[key]);
    }

    #[tokio::test]
    async fn s3_enforce_tls_refuses_http() {
        let cfg = S3Config {
            endpoint: "http://insecure:9000".into(),
            region: "us-east-1".into(),
            bucket: "cask".into(),
            access_key_id: "key".into(),
            secret_access_key: "secret".into(),
            enforce_tls: true,
        };
        let err = ObjectStore::s3(&cfg, "chunks").unwrap_err();
        assert!(err.to_string().contains("enforce_tls"));
    }

    #[tokio::test]
    async fn s3_operator_builds_for_https() {
        let cfg = S3Config {
            endpoint: "https://s3.example.com:9000".into(),
            region: "us-east-1".into(),
            bucket: "cask".into(),
            access_key_id: "key".into(),
            secret_access_key: "secret".into(),
            enforce_tls: true,
        };
        assert!(ObjectStore::s3(&cfg, "chunks").is_ok());
    }

    #[tokio::test]
    async fn prefixed_objects_land_under_prefix() {
        let op = Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish();
        let store = ObjectStore::with_operator(op.clone(), "chunks");
        let key = Key::of(b"prefixed");
        store.put(key, b"sealed".to_vec()).await.unwrap();
        assert!(op.exists(&format!("chunks/{key}")).await.unwrap());

        let mut listed = MemKeys::new();
        store.list_keys(&mut listed).await.unwrap();
        assert_eq!(listed.keys(), &[key]);
    }
}
