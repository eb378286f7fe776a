//! In-memory record source, used for fixtures and tests.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{batch_channel, Imported, RecordSource};
use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_CAPACITY};
use crate::error_handling::SourceError;
use crate::models::GeoRecord;

/// Streams a fixed list of records in batches.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    records: Vec<GeoRecord>,
    batch_size: usize,
    channel_capacity: usize,
}

impl InMemorySource {
    /// Source emitting `records` in batches of `batch_size`.
    pub fn new(records: Vec<GeoRecord>, batch_size: usize) -> Self {
        InMemorySource {
            records,
            batch_size,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Capacity of the batch and error channels.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_BATCH_SIZE)
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn import(&self, cancel: CancellationToken) -> Result<Imported, SourceError> {
        let (mut sender, imported) =
            batch_channel(self.batch_size, self.channel_capacity, cancel);
        let records = self.records.clone();

        tokio::spawn(async move {
            for record in records {
                if !sender.push(record).await {
                    return;
                }
            }
            sender.finish().await;
        });

        Ok(imported)
    }
}
