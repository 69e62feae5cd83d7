//! cask-pipeline: the three concurrent pipelines
//!
//! # Overview
//! - `split`: byte stream → chunk, hash, seal, store → ordered key stream
//! - `join`: key stream → fetch, authenticate, open → ordered byte stream
//! - `transfer`: key stream → index-skip, copy local→remote → moved keys
//!
//! Shared shape: bounded fan-out of worker tasks, single fan-in that awaits
//! per-item result channels in enqueue order. Output order equals input
//! order by construction, and a runtime position check turns any violation
//! into a hard error instead of silent corruption.

mod fan;

pub mod config;
pub mod join;
pub mod split;
pub mod transfer;

pub use config::{Config, KeyHash};
pub use join::join;
pub use split::split;
pub use transfer::transfer;
