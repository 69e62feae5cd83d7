//! Runtime pipeline configuration

use std::sync::Arc;

use cask_core::{Index, Key, Remote, Secret, Store};
use cask_crypto::Envelope;

/// Content-key function. The default is SHA-256; it is a plain function
/// pointer so workers can carry it without sharing state.
pub type KeyHash = fn(&[u8]) -> Key;

/// Everything one pipeline invocation needs: the secret with its derived
/// AEAD, the fan-out bounds, and the store roles.
///
/// The `local` store is split's destination, join's first get source, and
/// transfer's source. The `remote` is transfer's destination and join's
/// fallback source. The `index` is consulted by transfer only; when absent
/// no keys are skipped.
pub struct Config {
    pub secret: Secret,
    pub envelope: Envelope,
    pub key_hash: KeyHash,
    pub split_concurrency: usize,
    pub join_concurrency: usize,
    pub move_concurrency: usize,
    pub local: Arc<dyn Store>,
    pub remote: Option<Arc<dyn Remote>>,
    pub index: Option<Arc<dyn Index>>,
}

impl Config {
    /// A config with the default fan-out bounds and no remote.
    pub fn new(secret: Secret, local: Arc<dyn Store>) -> Config {
        let envelope = Envelope::new(&secret);
        Config {
            secret,
            envelope,
            key_hash: Key::of,
            split_concurrency: 64,
            join_concurrency: 10,
            move_concurrency: 64,
            local,
            remote: None,
            index: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn Remote>) -> Config {
        self.remote = Some(remote);
        self
    }

    pub fn with_index(mut self, index: Arc<dyn Index>) -> Config {
        self.index = Some(index);
        self
    }

    /// The ordered get sources join consults: the local store first, then
    /// the remote.
    pub fn get_sources(&self) -> Vec<Arc<dyn Store>> {
        let mut sources: Vec<Arc<dyn Store>> = vec![Arc::clone(&self.local)];
        if let Some(remote) = &self.remote {
            let remote: Arc<dyn Store> = remote.clone() as Arc<dyn Store>;
            sources.push(remote);
        }
        sources
    }
}
