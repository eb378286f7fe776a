//! Record sources.
//!
//! A source streams `Batch`es of records over one channel and reports each
//! malformed row as a separate value on a second channel. Both channels close
//! when the input is exhausted or the cancellation token fires.

mod csv;
mod memory;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error_handling::SourceError;
use crate::models::{Batch, GeoRecord};

pub use self::csv::{parse_row, CsvSource};
pub use memory::InMemorySource;

/// Receiving ends of a running import.
pub struct Imported {
    /// Batches in production order; the last one may be shorter than the batch size.
    pub batches: mpsc::Receiver<Batch>,
    /// One value per malformed row.
    pub errors: mpsc::Receiver<SourceError>,
}

/// Produces batches of geo records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Starts producing batches in the background.
    ///
    /// Opening the underlying resource happens before this returns, so a
    /// missing input surfaces here as an error rather than mid-stream.
    async fn import(&self, cancel: CancellationToken) -> Result<Imported, SourceError>;
}

/// Sending half shared by source implementations.
///
/// Buffers records into batches of `batch_size` and forwards each full batch.
/// Every send races against the cancellation token.
pub(crate) struct BatchSender {
    batches: mpsc::Sender<Batch>,
    errors: mpsc::Sender<SourceError>,
    buf: Batch,
    batch_size: usize,
    cancel: CancellationToken,
}

/// Creates a connected sender/`Imported` pair.
pub(crate) fn batch_channel(
    batch_size: usize,
    capacity: usize,
    cancel: CancellationToken,
) -> (BatchSender, Imported) {
    let (batch_tx, batch_rx) = mpsc::channel(capacity.max(1));
    let (error_tx, error_rx) = mpsc::channel(capacity.max(1));
    let batch_size = batch_size.max(1);

    let sender = BatchSender {
        batches: batch_tx,
        errors: error_tx,
        buf: Vec::with_capacity(batch_size),
        batch_size,
        cancel,
    };
    let imported = Imported {
        batches: batch_rx,
        errors: error_rx,
    };
    (sender, imported)
}

impl BatchSender {
    /// Buffers a record, sending the batch once full.
    ///
    /// Returns `false` when the import should stop (cancelled or receiver gone).
    pub(crate) async fn push(&mut self, record: GeoRecord) -> bool {
        self.buf.push(record);
        if self.buf.len() < self.batch_size {
            return true;
        }
        let batch = std::mem::replace(&mut self.buf, Vec::with_capacity(self.batch_size));
        self.send_batch(batch).await
    }

    /// Reports a malformed row.
    pub(crate) async fn report(&mut self, error: SourceError) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.errors.send(error) => sent.is_ok(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sends the final short batch, if any, and closes both channels.
    pub(crate) async fn finish(mut self) {
        if self.buf.is_empty() || self.cancel.is_cancelled() {
            return;
        }
        let batch = std::mem::take(&mut self.buf);
        self.send_batch(batch).await;
    }

    async fn send_batch(&mut self, batch: Batch) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.batches.send(batch) => sent.is_ok(),
        }
    }
}
