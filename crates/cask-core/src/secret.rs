//! The user secret: 32 bytes that scope deduplication and encryption
//!
//! Two properties hang off the secret. It is the AES-256 key every chunk is
//! sealed under, and its first 8 bytes parameterize the chunker's rolling
//! hash, so even chunk boundaries are secret-dependent. Identical data split
//! under different secrets shares nothing observable.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{CaskResult, Error};
use crate::key::KEY_SIZE;

/// A 32-byte user-held secret. Zeroized on drop.
#[derive(Clone)]
pub struct Secret {
    bytes: [u8; KEY_SIZE],
}

impl Secret {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Secret {
        Secret { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Generate a fresh random secret.
    pub fn generate() -> Secret {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Secret { bytes }
    }

    /// The rolling-hash polynomial: the first 8 bytes as an unsigned
    /// little-endian integer.
    pub fn polynomial(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.bytes[..8]);
        u64::from_le_bytes(head)
    }

    /// Parse the base-64 text form (same codec as keys).
    pub fn decode(text: &str) -> CaskResult<Secret> {
        let mut raw = URL_SAFE
            .decode(text)
            .map_err(|e| Error::Config(format!("failed to decode secret: {e}")))?;
        if raw.len() != KEY_SIZE {
            raw.zeroize();
            return Err(Error::Config(format!(
                "secret decoded to {} bytes, expected {KEY_SIZE}",
                raw.len()
            )));
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&raw);
        raw.zeroize();
        Ok(Secret { bytes })
    }

    /// The base-64 text form.
    pub fn encode(&self) -> String {
        URL_SAFE.encode(self.bytes)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let secret = Secret::generate();
        let back = Secret::decode(&secret.encode()).unwrap();
        assert_eq!(secret.as_bytes(), back.as_bytes());
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let short = URL_SAFE.encode([7u8; 12]);
        assert!(Secret::decode(&short).is_err());
    }

    #[test]
    fn polynomial_reads_first_eight_bytes_little_endian() {
        let mut bytes = [0u8; KEY_SIZE];
        bytes[..8].copy_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        let secret = Secret::from_bytes(bytes);
        assert_eq!(secret.polynomial(), 0x0807060504030201);
    }

    #[test]
    fn generated_secrets_differ() {
        let a = Secret::generate();
        let b = Secret::generate();
        assert_ne!(a.as_bytes(), b.as_bytes(), "random secrets must differ");
    }

    #[test]
    fn debug_is_redacted() {
        let secret = Secret::generate();
        assert!(!format!("{secret:?}").contains(&secret.encode()));
    }
}
