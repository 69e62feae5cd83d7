//! cask-crypto: the sealed form chunks persist in
//!
//! One module, one job: authenticated encryption of a chunk under the user
//! secret with the chunk's own content key as the nonce. See `envelope` for
//! why the deterministic extended nonce is a design feature rather than a
//! bug.

pub mod envelope;

pub use envelope::{Envelope, TAG_SIZE};
