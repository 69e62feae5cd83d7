//! Per-chunk AES-256-GCM sealing
//!
//! Sealed chunk format (binary):
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! key   = the 32-byte user secret
//! nonce = the chunk's content key (32 bytes, SHA-256 of the plaintext)
//! AAD   = empty
//! ```
//!
//! No nonce is stored: the content key the chunk is addressed by *is* the
//! nonce. Because that key is a collision-resistant hash of the plaintext,
//! a repeated nonce under one secret can only mean a repeated plaintext, so
//! GCM's nonce-uniqueness requirement holds exactly where it matters. The
//! flip side is determinism: one (secret, plaintext) pair always seals to
//! the same bytes, which is what lets identical chunks deduplicate across
//! invocations and machines.
//!
//! 32 bytes is not GCM's standard 96-bit nonce size; GCM feeds oversized
//! nonces through GHASH to derive the counter block, and the cipher here is
//! instantiated with that extended size.

use aes_gcm::aead::consts::U32;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;

use cask_core::{CaskResult, Error, Key, Secret};

/// AES-256-GCM with a 32-byte nonce.
type ExtendedNonceGcm = AesGcm<Aes256, U32>;

/// GCM tag bytes appended to every sealed chunk.
pub const TAG_SIZE: usize = 16;

/// Seals and opens chunks under a fixed secret. Cheap to clone; safe to use
/// from concurrent workers.
#[derive(Clone)]
pub struct Envelope {
    cipher: ExtendedNonceGcm,
}

impl Envelope {
    pub fn new(secret: &Secret) -> Envelope {
        Envelope {
            cipher: ExtendedNonceGcm::new(GenericArray::from_slice(secret.as_bytes())),
        }
    }

    /// Seal `plaintext` under its content key. `key` must be the content
    /// key of `plaintext`; sealing under anything else produces an envelope
    /// that will never open at its own address.
    pub fn seal(&self, key: &Key, plaintext: &[u8]) -> CaskResult<Vec<u8>> {
        self.cipher
            .encrypt(GenericArray::from_slice(key.as_bytes()), plaintext)
            .map_err(|_| Error::Seal(*key))
    }

    /// Open a sealed chunk. An [`Error::Authentication`] means the stored
    /// envelope is corrupt, was tampered with, or was sealed under a
    /// different secret; callers must not retry or fall back to another
    /// source, because the ciphertext bound to this key is wrong.
    pub fn open(&self, key: &Key, envelope: &[u8]) -> CaskResult<Vec<u8>> {
        self.cipher
            .decrypt(GenericArray::from_slice(key.as_bytes()), envelope)
            .map_err(|_| Error::Authentication(*key))
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(fill: u8) -> Envelope {
        Envelope::new(&Secret::from_bytes([fill; 32]))
    }

    #[test]
    fn seal_open_roundtrip() {
        let env = envelope(1);
        let plaintext = b"hello, sealed world!";
        let key = Key::of(plaintext);

        let sealed = env.seal(&key, plaintext).unwrap();
        let opened = env.open(&key, &sealed).unwrap();
        assert_eq!(&opened, plaintext);
    }

    #[test]
    fn empty_chunk_roundtrip() {
        let env = envelope(1);
        let key = Key::of(b"");
        let sealed = env.seal(&key, b"").unwrap();
        assert_eq!(env.open(&key, &sealed).unwrap(), b"");
    }

    #[test]
    fn sealing_is_deterministic() {
        // same secret + same plaintext must give identical bytes; this is
        // the property dedup stands on
        let env = envelope(1);
        let plaintext = b"repeated chunk";
        let key = Key::of(plaintext);

        let a = env.seal(&key, plaintext).unwrap();
        let b = env.seal(&key, plaintext).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_secrets_seal_differently() {
        let plaintext = b"shared plaintext";
        let key = Key::of(plaintext);

        let a = envelope(1).seal(&key, plaintext).unwrap();
        let b = envelope(2).seal(&key, plaintext).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sealed_size_is_plaintext_plus_tag() {
        let env = envelope(1);
        let plaintext = vec![0u8; 1000];
        let key = Key::of(&plaintext);
        assert_eq!(env.seal(&key, &plaintext).unwrap().len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn any_flipped_byte_fails_authentication() {
        let env = envelope(1);
        let plaintext = b"integrity matters";
        let key = Key::of(plaintext);
        let sealed = env.seal(&key, plaintext).unwrap();

        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            let err = env.open(&key, &tampered).unwrap_err();
            assert!(
                err.to_string().contains("authentication failed"),
                "byte {i}: {err}"
            );
        }
    }

    #[test]
    fn wrong_secret_fails_authentication() {
        let plaintext = b"secret data";
        let key = Key::of(plaintext);
        let sealed = envelope(1).seal(&key, plaintext).unwrap();
        assert!(envelope(2).open(&key, &sealed).is_err());
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let env = envelope(1);
        let plaintext = b"addressed content";
        let sealed = env.seal(&Key::of(plaintext), plaintext).unwrap();
        assert!(env.open(&Key::of(b"other"), &sealed).is_err());
    }
}
