//! cask-core: keys, secrets, error kinds, and the contracts shared by the
//! cask pipelines and stores
//!
//! # Overview
//! - `key` / `secret`: the two 32-byte values everything hangs off
//! - `traits`: `Store`, `Remote`, `Index`, `KeyRead`/`KeyWrite`, `ChunkRead`
//! - `keys`: in-memory and text-line key reader/writer implementations
//! - `error`: the typed failure kinds pipelines return
//! - `config`: the cask.toml schema

pub mod config;
pub mod error;
pub mod key;
pub mod keys;
pub mod secret;
pub mod traits;

pub use error::{CaskResult, Error};
pub use key::{Key, KEY_SIZE};
pub use keys::{MemKeys, TextKeyReader, TextKeyWriter};
pub use secret::Secret;
pub use traits::{ChunkRead, Index, IndexSink, KeyRead, KeyWrite, Remote, Store};
