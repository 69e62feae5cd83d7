//! Content keys: 32-byte chunk addresses
//!
//! A key is the SHA-256 hash of a chunk's plaintext. The same value serves
//! three roles: the address the sealed chunk is stored under, the extended
//! nonce it is sealed with, and the value a transfer index is queried for.
//! Keys travel between processes as URL-safe base-64 text (44 chars).

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::{CaskResult, Error};

/// Byte size of a content key (and of a secret).
pub const KEY_SIZE: usize = 32;

/// The content key of a single chunk.
///
/// Equality is byte equality; the text form is URL-safe base-64 with
/// padding, so round-tripping through [`Display`](std::fmt::Display) and
/// [`Key::decode`] is lossless.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key([u8; KEY_SIZE]);

impl Key {
    /// Hash `data` into its content key.
    pub fn of(data: &[u8]) -> Key {
        Key(Sha256::digest(data).into())
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Key {
        Key(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Parse the base-64 text form. Rejects any input whose decoded form is
    /// not exactly [`KEY_SIZE`] bytes.
    pub fn decode(text: &str) -> CaskResult<Key> {
        let raw = URL_SAFE.decode(text).map_err(|e| Error::KeyCodec {
            input: text.to_string(),
            reason: e.to_string(),
        })?;
        let bytes: [u8; KEY_SIZE] = raw.try_into().map_err(|raw: Vec<u8>| Error::KeyCodec {
            input: text.to_string(),
            reason: format!("decoded length {}, expected {KEY_SIZE}", raw.len()),
        })?;
        Ok(Key(bytes))
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&URL_SAFE.encode(self.0))
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key({self})")
    }
}

impl std::str::FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::decode(s)
    }
}
