//! In-memory chunk store

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cask_core::{CaskResult, Error, Key, KeyWrite, Remote, Store};

/// Chunks in a process-local map.
///
/// First put at a key wins and later puts are no-ops, which is exactly the
/// idempotence the pipelines rely on. The test suites lean on this store for
/// hermetic runs; [`MemStore::overwrite`] exists so corruption scenarios can
/// bypass the idempotent put.
#[derive(Debug, Default)]
pub struct MemStore {
    chunks: Mutex<HashMap<Key, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.chunks
            .lock()
            .expect("store lock poisoned")
            .contains_key(key)
    }

    /// Replace stored bytes unconditionally, bypassing put idempotence.
    /// Corruption tests use this to damage an envelope in place.
    pub fn overwrite(&self, key: Key, chunk: Vec<u8>) {
        self.chunks
            .lock()
            .expect("store lock poisoned")
            .insert(key, chunk);
    }

    /// Full contents in key order, for store-equality assertions.
    pub fn snapshot(&self) -> Vec<(Key, Vec<u8>)> {
        let chunks = self.chunks.lock().expect("store lock poisoned");
        let mut entries: Vec<_> = chunks.iter().map(|(k, v)| (*k, v.clone())).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }
}

#[async_trait]
impl Store for MemStore {
    async fn put(&self, key: Key, chunk: Vec<u8>) -> CaskResult<()> {
        let mut chunks = self.chunks.lock().expect("store lock poisoned");
        chunks.entry(key).or_insert(chunk);
        Ok(())
    }

    async fn get(&self, key: &Key) -> CaskResult<Vec<u8>> {
        let chunks = self.chunks.lock().expect("store lock poisoned");
        chunks.get(key).cloned().ok_or(Error::NoSuchKey(*key))
    }
}

#[async_trait]
impl Remote for MemStore {
    async fn list_keys(&self, out: &mut (dyn KeyWrite + Send)) -> CaskResult<()> {
        let mut keys: Vec<Key> = {
            let chunks = self.chunks.lock().expect("store lock poisoned");
            chunks.keys().copied().collect()
        };
        keys.sort();
        for key in keys {
            out.write_key(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_core::MemKeys;

    #[tokio::test]
    async fn get_of_missing_key_is_no_such_key() {
        let store = MemStore::new();
        let err = store.get(&Key::of(b"absent")).await.unwrap_err();
        assert!(matches!(err, Error::NoSuchKey(_)));
    }

    #[tokio::test]
    async fn put_is_idempotent_first_write_wins() {
        let store = MemStore::new();
        let key = Key::of(b"chunk");
        store.put(key, b"sealed".to_vec()).await.unwrap();
        store.put(key, b"other bytes".to_vec()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), b"sealed");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn overwrite_bypasses_idempotence() {
        let store = MemStore::new();
        let key = Key::of(b"chunk");
        store.put(key, b"sealed".to_vec()).await.unwrap();
        store.overwrite(key, vec![0x00]);
        assert_eq!(store.get(&key).await.unwrap(), vec![0x00]);
    }

    #[tokio::test]
    async fn list_keys_enumerates_everything() {
        let store = MemStore::new();
        let mut expected: Vec<Key> = (0u8..5).map(|i| Key::of(&[i])).collect();
        for key in &expected {
            store.put(*key, vec![0u8]).await.unwrap();
        }
        expected.sort();

        let mut listed = MemKeys::new();
        store.list_keys(&mut listed).await.unwrap();
        assert_eq!(listed.keys(), expected.as_slice());
    }
}
