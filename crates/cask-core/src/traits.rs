//! The contracts the pipelines are written against
//!
//! Stores and remotes are async trait objects because every backend worth
//! having (disk, object storage) is I/O; key readers and writers stay
//! synchronous because they wrap in-memory lists or line-oriented text.

use async_trait::async_trait;

use crate::error::CaskResult;
use crate::key::Key;

/// A chunk container addressed by content key.
///
/// Put is idempotent: putting a key that is already present is a no-op and
/// must not fail. Implementations must tolerate concurrent callers; two
/// simultaneous puts at the same key must not leave two distinct values.
/// Get of an absent key returns [`Error::NoSuchKey`](crate::Error::NoSuchKey).
#[async_trait]
pub trait Store: Send + Sync {
    async fn put(&self, key: Key, chunk: Vec<u8>) -> CaskResult<()>;

    async fn get(&self, key: &Key) -> CaskResult<Vec<u8>>;
}

/// A store that can additionally enumerate the keys it holds, so a transfer
/// can skip chunks the destination already has.
///
/// The listing is not atomic with respect to concurrent puts; callers must
/// treat it as a lower bound on what the remote holds.
#[async_trait]
pub trait Remote: Store {
    /// Write every key currently held to `out`. Object names that do not
    /// decode to a 32-byte key are not part of the chunk namespace and are
    /// skipped.
    async fn list_keys(&self, out: &mut (dyn KeyWrite + Send)) -> CaskResult<()>;
}

/// Membership oracle for keys known to exist at a transfer destination.
pub trait Index: Send + Sync {
    fn has(&self, key: &Key) -> bool;

    fn add(&self, key: Key) -> CaskResult<()>;
}

/// Adapts an [`Index`] into a [`KeyWrite`] so a remote listing can populate
/// it.
pub struct IndexSink<'a>(pub &'a dyn Index);

impl KeyWrite for IndexSink<'_> {
    fn write_key(&mut self, key: Key) -> CaskResult<()> {
        self.0.add(key)
    }
}

/// Sequential key input.
pub trait KeyRead {
    /// The next key, or `Ok(None)` at end of stream.
    fn read_key(&mut self) -> CaskResult<Option<Key>>;

    /// Reposition to the first key; subsequent reads re-yield the same keys
    /// in the same order. Needed by callers that run a pipeline twice over
    /// one key source.
    fn reset(&mut self) -> CaskResult<()>;
}

/// Sequential key output.
pub trait KeyWrite {
    fn write_key(&mut self, key: Key) -> CaskResult<()>;
}

/// Produces the chunks of a byte stream, one at a time.
///
/// The returned slice may point into an internal buffer that the next call
/// reuses; callers that keep chunk bytes must copy them first.
pub trait ChunkRead {
    /// The next chunk, or `Ok(None)` at end of stream.
    fn next_chunk(&mut self) -> CaskResult<Option<&[u8]>>;
}
