//! cask-chunks: content-defined chunking keyed by the user secret
//!
//! # Overview
//! - `gear`: rolling-hash boundary detection; the gear table is expanded
//!   from the secret's polynomial so boundaries are secret-dependent
//! - `stream`: `StreamChunker`, a single-buffer chunker over any `Read`
//!
//! Boundaries are stable under local edits, which is what makes dedup work
//! across revisions of the same data.

pub mod gear;
pub mod stream;

pub use gear::ChunkSizes;
pub use stream::StreamChunker;
