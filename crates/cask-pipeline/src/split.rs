//! The split pipeline: byte stream in, ordered content keys out
//!
//! Each chunk passes through three stages — hash, seal, store — serially
//! within the chunk and concurrently across chunks. The key-writer sees
//! keys in exactly the order the chunker produced them, which is what makes
//! the key stream a faithful description of the input.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use cask_core::{CaskResult, ChunkRead, Error, Key, KeyWrite, Store};
use cask_crypto::Envelope;

use crate::config::{Config, KeyHash};
use crate::fan::{check_order, drain, send_item, Item};

/// Split the stream behind `chunks` into sealed chunks in the local store,
/// writing each chunk's content key to `keys` in input order.
///
/// The first failing stage aborts the pipeline: nothing more is dispatched,
/// in-flight workers are awaited and discarded, and the original error is
/// returned. Chunks stored before the failure stay put — put is idempotent,
/// so a rerun converges on the same state.
pub async fn split<C, W>(chunks: &mut C, keys: &mut W, cfg: &Config) -> CaskResult<()>
where
    C: ChunkRead + ?Sized,
    W: KeyWrite + ?Sized,
{
    let (item_tx, mut item_rx) = mpsc::channel::<Item<Key>>(cfg.split_concurrency.max(1));
    let cancel = CancellationToken::new();

    let producer = {
        let cancel = cancel.clone();
        async move {
            let mut pos = 0u64;
            loop {
                // a failed consumer cancels; dispatch nothing more
                if cancel.is_cancelled() {
                    break;
                }
                // the chunker reuses its buffer: copy before handing off
                let chunk = match chunks.next_chunk() {
                    Ok(Some(data)) => data.to_vec(),
                    Ok(None) => break,
                    Err(err) => {
                        send_item(&item_tx, &cancel, Item::Fault(err)).await;
                        break;
                    }
                };

                let (done_tx, done_rx) = oneshot::channel();
                let store = Arc::clone(&cfg.local);
                let envelope = cfg.envelope.clone();
                let key_hash = cfg.key_hash;
                tokio::spawn(async move {
                    let _ = done_tx.send(seal_and_store(chunk, key_hash, &envelope, &*store).await);
                });

                let item = Item::Work {
                    pos,
                    result: done_rx,
                };
                if !send_item(&item_tx, &cancel, item).await {
                    break;
                }
                pos += 1;
            }
        }
    };

    let consumer = async {
        let mut next = 0u64;
        while let Some(item) = item_rx.recv().await {
            let step = async {
                match item {
                    Item::Fault(err) => Err(err),
                    Item::Work { pos, result } => {
                        check_order(next, pos)?;
                        let key = result.await.map_err(|_| Error::Worker(pos))??;
                        keys.write_key(key)?;
                        next = pos + 1;
                        Ok(())
                    }
                }
            }
            .await;

            if let Err(err) = step {
                cancel.cancel();
                drain(&mut item_rx).await;
                return Err(err);
            }
        }
        debug!(chunks = next, "split complete");
        Ok(())
    };

    let ((), result) = tokio::join!(producer, consumer);
    result
}

async fn seal_and_store(
    chunk: Vec<u8>,
    key_hash: KeyHash,
    envelope: &Envelope,
    store: &dyn Store,
) -> CaskResult<Key> {
    let key = key_hash(&chunk);
    let sealed = envelope.seal(&key, &chunk)?;
    store.put(key, sealed).await.map_err(|e| e.for_key(&key))?;
    Ok(key)
}
