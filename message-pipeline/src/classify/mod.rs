use std::sync::Arc;

use common_blob::BlobStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::broker::{BrokerSink, RawRecord};
use crate::error::PipelineError;
use crate::writer::ReliableWriter;

pub mod message;
pub mod policy;

pub use message::{ClassifiableMessage, REQUIRED_FIELDS};
pub use policy::{AcceptancePolicy, KeyLengthPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub read_topic: String,
    pub write_queue_good: String,
    pub write_queue_bad: String,
    pub message_count: Option<usize>,
    pub timeout_ms: Option<u64>,
}

/// Running totals of the values seen in each class during one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct ClassTotals {
    pub good: f64,
    pub bad: f64,
}

/// A batch split into its two classes, in arrival order within each class.
#[derive(Debug, Default)]
pub struct ClassifiedBatch {
    pub accepted: Vec<ClassifiableMessage>,
    pub rejected: Vec<ClassifiableMessage>,
    pub totals: ClassTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifyOutcome {
    pub read: usize,
    pub skipped: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub stored: usize,
    pub totals: ClassTotals,
}

#[derive(Serialize)]
struct TotalTrailer {
    #[serde(rename = "TOTAL")]
    total: f64,
}

pub struct Classifier {
    policy: Arc<dyn AcceptancePolicy>,
    blob_store: Arc<dyn BlobStore>,
    dataset_name: String,
    writer: ReliableWriter,
}

impl Classifier {
    pub fn new(
        policy: Arc<dyn AcceptancePolicy>,
        blob_store: Arc<dyn BlobStore>,
        dataset_name: String,
        writer: ReliableWriter,
    ) -> Self {
        Self {
            policy,
            blob_store,
            dataset_name,
            writer,
        }
    }

    /// Splits messages by the acceptance policy and accumulates both totals. Each accepted
    /// message records the good total including its own value.
    pub fn classify(&self, messages: Vec<ClassifiableMessage>) -> ClassifiedBatch {
        let mut batch = ClassifiedBatch::default();

        for mut message in messages {
            if self.policy.accepts(&message) {
                batch.totals.good += message.value();
                message.set_running_total(batch.totals.good);
                debug!("Accepted message with key {}", message.key());
                batch.accepted.push(message);
            } else {
                batch.totals.bad += message.value();
                debug!("Rejected message with key {}", message.key());
                batch.rejected.push(message);
            }
        }

        batch
    }

    /// Writes every accepted message to the blob store, attaching the returned id. A failed
    /// put leaves the message without an id. Returns how many were stored.
    pub async fn store_accepted(&self, accepted: &mut [ClassifiableMessage]) -> usize {
        let mut stored = 0;

        for message in accepted.iter_mut() {
            let data = match serde_json::to_string(&message.stored_form()) {
                Ok(data) => data,
                Err(e) => {
                    error!("Could not serialize message {} for storage: {}", message.key(), e);
                    continue;
                }
            };

            match self.blob_store.put(&self.dataset_name, &data).await {
                Ok(id) => {
                    message.set_storage_id(id);
                    stored += 1;
                }
                Err(e) => {
                    metrics::counter!("pipeline_blob_store_failures").increment(1);
                    error!("Failed to store message {}: {}", message.key(), e);
                }
            }
        }

        stored
    }

    /// Parses, classifies, stores and republishes one batch. Accepted messages go to
    /// `good_sink` and rejected ones to `bad_sink`, each followed by its class total.
    pub async fn process<W>(
        &self,
        sink: &W,
        good_sink: &str,
        bad_sink: &str,
        records: Vec<RawRecord>,
    ) -> Result<ClassifyOutcome, PipelineError>
    where
        W: BrokerSink + ?Sized,
    {
        let read = records.len();
        let mut messages = Vec::with_capacity(read);
        for record in &records {
            match ClassifiableMessage::parse(record) {
                Ok(message) => messages.push(message),
                Err(e) => warn!("Skipping unparseable message: {}", e),
            }
        }
        let skipped = read - messages.len();

        let mut batch = self.classify(messages);
        let stored = self.store_accepted(&mut batch.accepted).await;

        let accepted: Vec<_> = batch.accepted.iter().map(|m| m.accepted_form()).collect();
        let rejected: Vec<_> = batch.rejected.iter().map(|m| m.rejected_form()).collect();

        self.writer.write(sink, good_sink, &accepted).await?;
        self.writer.write(sink, bad_sink, &rejected).await?;
        self.writer
            .write(sink, good_sink, &[TotalTrailer { total: batch.totals.good }])
            .await?;
        self.writer
            .write(sink, bad_sink, &[TotalTrailer { total: batch.totals.bad }])
            .await?;

        let outcome = ClassifyOutcome {
            read,
            skipped,
            accepted: batch.accepted.len(),
            rejected: batch.rejected.len(),
            stored,
            totals: batch.totals,
        };
        info!(
            "Classified {} messages: {} accepted, {} rejected, {} skipped",
            read, outcome.accepted, outcome.rejected, skipped
        );

        Ok(outcome)
    }
}
