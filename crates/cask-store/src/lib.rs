//! cask-store: chunk store backends
//!
//! # Overview
//! - `mem`: process-local map store, the hermetic-test workhorse
//! - `object`: OpenDAL-backed store — fs for the local role, S3-compatible
//!   services for the remote role, the memory service for tests
//! - `index`: in-memory membership index for transfer skip decisions
//!
//! All backends honor the same two guarantees the pipelines assume:
//! idempotent put, and a distinguished not-found on get.

pub mod index;
pub mod mem;
pub mod object;

pub use index::MemIndex;
pub use mem::MemStore;
pub use object::{ObjectStore, S3Config};
