use thiserror::Error;

use crate::key::Key;

pub type CaskResult<T> = Result<T, Error>;

/// Every failure kind the pipelines distinguish.
///
/// The only error any pipeline recovers from locally is [`Error::NoSuchKey`]
/// returned by a single get source during join, which falls through to the
/// next source. Everything else aborts the running pipeline and is returned
/// verbatim as the first fatal failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Every configured get source reported the key absent.
    #[error("no such key '{0}'")]
    NoSuchKey(Key),

    /// A store failed with something other than not-found.
    #[error("storage failed: {0}")]
    Storage(String),

    /// The envelope did not authenticate: corrupted ciphertext or wrong
    /// secret. Never retried, never masked by another source.
    #[error("authentication failed for chunk '{0}'")]
    Authentication(Key),

    #[error("failed to seal chunk '{0}'")]
    Seal(Key),

    #[error("chunking failed: {0}")]
    Chunker(String),

    #[error("key reader failed: {0}")]
    Reader(String),

    #[error("writer failed: {0}")]
    Writer(String),

    #[error("failed to index remote: {0}")]
    Index(String),

    /// The fan-in observed a position regression. Ordering is guaranteed by
    /// construction, so this is a pipeline bug worth a report, not a
    /// condition to correct silently.
    #[error("ordering violated: chunk '{later}' arrived in place of chunk '{earlier}'")]
    Ordering { earlier: u64, later: u64 },

    /// A worker task died without publishing a result.
    #[error("worker for chunk '{0}' terminated without a result")]
    Worker(u64),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to decode '{input}' as key: {reason}")]
    KeyCodec { input: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Annotate a storage failure with the chunk key a worker was handling.
    pub fn for_key(self, key: &Key) -> Error {
        match self {
            Error::Storage(msg) => Error::Storage(format!("chunk '{key}': {msg}")),
            other => other,
        }
    }
}
