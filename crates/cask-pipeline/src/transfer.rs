//! The transfer pipeline: copy chunks from the local store to the remote
//!
//! The CLI calls this `mv`. For every key read, the sealed chunk is copied
//! source → destination unless the index says the destination already has
//! it; each key actually moved is written to the output key-writer, in
//! input order, only after its copy succeeded. The output is therefore a
//! subsequence of the input restricted to keys the destination was missing.
//!
//! The index may be stale — enumeration is not atomic with concurrent
//! writers. A stale absent entry only costs a redundant idempotent put; a
//! stale present entry is only wrong if the destination lost the chunk, in
//! which case a later join fails no-such-key.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use cask_core::{CaskResult, Error, IndexSink, Key, KeyRead, KeyWrite, Remote, Store};

use crate::config::Config;
use crate::fan::{check_order, drain, send_item, Item};

/// Move the chunks named by `keys` from the local store to the remote,
/// writing each moved key to `moved`.
///
/// When an index is configured the destination is enumerated into it first,
/// as a synchronous pre-step; an enumeration failure aborts the run before
/// any chunk moves.
pub async fn transfer<R, W>(keys: &mut R, moved: &mut W, cfg: &Config) -> CaskResult<()>
where
    R: KeyRead + ?Sized,
    W: KeyWrite + ?Sized,
{
    let remote = cfg
        .remote
        .clone()
        .ok_or_else(|| Error::Config("transfer requires a remote store".into()))?;

    if let Some(index) = &cfg.index {
        let mut sink = IndexSink(index.as_ref());
        remote
            .list_keys(&mut sink)
            .await
            .map_err(|err| Error::Index(err.to_string()))?;
    }

    let (item_tx, mut item_rx) = mpsc::channel::<Item<Key>>(cfg.move_concurrency.max(1));
    let cancel = CancellationToken::new();

    let producer = {
        let cancel = cancel.clone();
        let remote = &remote;
        async move {
            let mut pos = 0u64;
            loop {
                // a failed consumer cancels; dispatch nothing more
                if cancel.is_cancelled() {
                    break;
                }
                let key = match keys.read_key() {
                    Ok(Some(key)) => key,
                    Ok(None) => break,
                    Err(err) => {
                        send_item(&item_tx, &cancel, Item::Fault(err)).await;
                        break;
                    }
                };

                if let Some(index) = &cfg.index {
                    if index.has(&key) {
                        debug!(key = %key, "skip: destination already has chunk");
                        continue;
                    }
                }

                let (done_tx, done_rx) = oneshot::channel();
                let source = Arc::clone(&cfg.local);
                let dest = Arc::clone(remote);
                tokio::spawn(async move {
                    let _ = done_tx.send(copy_chunk(key, &*source, &*dest).await);
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
                        moved.write_key(key)?;
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
        debug!(moved = next, "transfer complete");
        Ok(())
    };

    let ((), result) = tokio::join!(producer, consumer);
    result
}

async fn copy_chunk(key: Key, source: &dyn Store, dest: &dyn Remote) -> CaskResult<Key> {
    let sealed = source.get(&key).await.map_err(|e| e.for_key(&key))?;
    dest.put(key, sealed).await.map_err(|e| e.for_key(&key))?;
    Ok(key)
}
