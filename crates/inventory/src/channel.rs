//! Bounded asset channel between one producer and any number of consumers.
//!
//! [`AssetSender`] is move-only: there is exactly one per channel and dropping
//! it (or calling [`AssetSender::close`]) is the close. Consumers hold
//! [`AssetReceiver`] clones, which have no way to close the stream, and treat
//! the end of iteration as stream-complete.

use crate::error::{Error, Result};
use crate::types::{Asset, Batch};
use crossbeam_channel::{Receiver, Sender};

/// Create a bounded asset channel holding at most `capacity` batches.
///
/// A capacity of zero is raised to one so the producer can always make progress
/// once a consumer is waiting.
pub fn channel(capacity: usize) -> (AssetSender, AssetReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (AssetSender { tx }, AssetReceiver { rx })
}

/// The single writing end of an asset channel.
#[derive(Debug)]
pub struct AssetSender {
    tx: Sender<Batch>,
}

impl AssetSender {
    /// Send one batch, blocking while the channel is full.
    pub fn send(&self, batch: Batch) -> Result<()> {
        self.tx.send(batch).map_err(|_| Error::Disconnected)
    }

    /// Split `assets` into batches of at most `batch_size` and send each.
    ///
    /// Returns the number of assets sent. Nothing is sent for an empty list.
    pub fn send_chunked(&self, assets: Vec<Asset>, batch_size: usize) -> Result<usize> {
        let total = assets.len();
        let batch_size = batch_size.max(1);
        let mut assets = assets.into_iter().peekable();

        while assets.peek().is_some() {
            let batch: Batch = assets.by_ref().take(batch_size).collect();
            self.send(batch)?;
        }

        Ok(total)
    }

    /// Close the channel after the final send.
    pub fn close(self) {
        drop(self);
    }
}

/// A reading end of an asset channel. Cheap to clone, one per consumer.
#[derive(Debug, Clone)]
pub struct AssetReceiver {
    rx: Receiver<Batch>,
}

impl AssetReceiver {
    /// Block until a batch arrives. `None` means the producer closed the stream.
    pub fn recv(&self) -> Option<Batch> {
        self.rx.recv().ok()
    }

    /// Iterate batches until the producer closes the stream.
    pub fn iter(&self) -> impl Iterator<Item = Batch> + '_ {
        self.rx.iter()
    }
}
