//! The join pipeline: key stream in, ordered plaintext out
//!
//! Workers fetch and open chunks concurrently; the byte-writer receives
//! plaintexts strictly in key order, so the concatenation is the original
//! stream. Fetching walks the configured get sources in order — a source
//! missing the key is not an error, every source missing it is.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use cask_core::{CaskResult, Error, Key, KeyRead, Store};
use cask_crypto::Envelope;

use crate::config::Config;
use crate::fan::{check_order, drain, send_item, Item};

/// Fetch, authenticate, and decrypt every chunk named by `keys`, writing
/// plaintexts to `out` in key order.
///
/// Fails with [`Error::NoSuchKey`] when a key is absent from every source,
/// and with [`Error::Authentication`] when a stored envelope does not open —
/// the latter is never papered over by trying another source, because the
/// ciphertext bound to that key is wrong wherever it came from.
pub async fn join<R, W>(keys: &mut R, out: &mut W, cfg: &Config) -> CaskResult<()>
where
    R: KeyRead + ?Sized,
    W: Write + ?Sized,
{
    let sources = cfg.get_sources();
    let (item_tx, mut item_rx) = mpsc::channel::<Item<Vec<u8>>>(cfg.join_concurrency.max(1));
    let cancel = CancellationToken::new();

    let producer = {
        let cancel = cancel.clone();
        let sources = &sources;
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

                let (done_tx, done_rx) = oneshot::channel();
                let sources = sources.clone();
                let envelope = cfg.envelope.clone();
                tokio::spawn(async move {
                    let _ = done_tx.send(fetch_and_open(key, &sources, &envelope).await);
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
                        let chunk = result.await.map_err(|_| Error::Worker(pos))??;
                        out.write_all(&chunk)
                            .map_err(|e| Error::Writer(e.to_string()))?;
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
        debug!(chunks = next, "join complete");
        Ok(())
    };

    let ((), result) = tokio::join!(producer, consumer);
    result
}

/// Try each get source in order; the first hit wins. Not-found falls
/// through to the next source, anything else is fatal immediately.
async fn fetch_and_open(
    key: Key,
    sources: &[Arc<dyn Store>],
    envelope: &Envelope,
) -> CaskResult<Vec<u8>> {
    let mut sealed = None;
    for source in sources {
        match source.get(&key).await {
            Ok(bytes) => {
                sealed = Some(bytes);
                break;
            }
            Err(Error::NoSuchKey(_)) => continue,
            Err(err) => return Err(err.for_key(&key)),
        }
    }
    match sealed {
        Some(sealed) => envelope.open(&key, &sealed),
        None => Err(Error::NoSuchKey(key)),
    }
}
