//! Shared fan-out/fan-in plumbing
//!
//! All three pipelines have the same skeleton: a producer reads input,
//! spawns one worker task per item, and enqueues `(position, result
//! receiver)` pairs onto a bounded channel; a consumer drains that channel
//! in enqueue order and awaits each receiver before touching the output.
//! The channel bound is the concurrency limit (a full channel blocks the
//! producer), and awaiting receivers in channel order is what makes output
//! order equal input order no matter how workers interleave.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use cask_core::{CaskResult, Error};

/// One unit of in-flight work, or a producer-side failure travelling
/// in-band so the consumer surfaces it in position order.
pub(crate) enum Item<T> {
    Work {
        pos: u64,
        result: oneshot::Receiver<CaskResult<T>>,
    },
    Fault(Error),
}

/// Enqueue an item unless the consumer has already failed. Returns false
/// when the producer should stop.
pub(crate) async fn send_item<T>(
    tx: &mpsc::Sender<Item<T>>,
    cancel: &CancellationToken,
    item: Item<T>,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

/// Consume and discard everything still queued after a fatal error, waiting
/// out in-flight workers so nothing outlives the pipeline call.
pub(crate) async fn drain<T>(rx: &mut mpsc::Receiver<Item<T>>) {
    while let Some(item) = rx.recv().await {
        if let Item::Work { result, .. } = item {
            let _ = result.await;
        }
    }
}

/// The ordering guard. Positions are assigned sequentially and the channel
/// is FIFO, so anything but the expected position is a pipeline bug; it is
/// reported rather than silently reordered because a wrong order here means
/// corrupted output.
pub(crate) fn check_order(expected: u64, pos: u64) -> CaskResult<()> {
    if pos != expected {
        return Err(Error::Ordering {
            earlier: expected,
            later: pos,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_positions_pass() {
        assert!(check_order(0, 0).is_ok());
        assert!(check_order(7, 7).is_ok());
    }

    #[test]
    fn out_of_order_position_is_fatal() {
        let err = check_order(3, 5).unwrap_err();
        assert!(matches!(err, Error::Ordering { earlier: 3, later: 5 }));
    }

    #[tokio::test]
    async fn send_item_observes_cancellation() {
        let (tx, _rx) = mpsc::channel::<Item<()>>(1);
        let cancel = CancellationToken::new();
        // fill the only slot so the next send would block forever
        assert!(send_item(&tx, &cancel, Item::Fault(Error::Storage("x".into()))).await);
        cancel.cancel();
        assert!(!send_item(&tx, &cancel, Item::Fault(Error::Storage("y".into()))).await);
    }
}
