use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::broker::{BrokerError, BrokerSink};
use crate::retry::{retry_with_budget, RetriesExhausted, RetryPolicy};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to serialize record {index}: {source}")]
    Serialization {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {index} was not published to {name}: {source}")]
    RetriesExhausted {
        name: String,
        index: usize,
        #[source]
        source: RetriesExhausted<BrokerError>,
    },
}

/// Publishes records one at a time, in order, retrying each until the broker confirms it.
#[derive(Debug, Clone)]
pub struct ReliableWriter {
    policy: RetryPolicy,
    publish_timeout: Duration,
}

impl ReliableWriter {
    pub fn new(policy: RetryPolicy, publish_timeout: Duration) -> Self {
        Self {
            policy,
            publish_timeout,
        }
    }

    /// Every record is serialized before anything is published, so a serialization failure
    /// publishes nothing. A record whose retries run out stops the write; records after it
    /// are not attempted.
    pub async fn write<W, T>(&self, sink: &W, name: &str, records: &[T]) -> Result<(), WriteError>
    where
        W: BrokerSink + ?Sized,
        T: Serialize,
    {
        let payloads = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                serde_json::to_string(record)
                    .map_err(|source| WriteError::Serialization { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (index, payload) in payloads.iter().enumerate() {
            self.publish_one(sink, name, payload)
                .await
                .map_err(|source| {
                    error!("Giving up on record {} for {}: {}", index, name, source);
                    WriteError::RetriesExhausted {
                        name: name.to_owned(),
                        index,
                        source,
                    }
                })?;
        }

        debug!("Published {} records to {}", payloads.len(), name);
        Ok(())
    }

    async fn publish_one<W>(
        &self,
        sink: &W,
        name: &str,
        payload: &str,
    ) -> Result<(), RetriesExhausted<BrokerError>>
    where
        W: BrokerSink + ?Sized,
    {
        retry_with_budget(&self.policy, |_| async move {
            metrics::counter!("pipeline_publish_attempts", "sink" => name.to_owned()).increment(1);
            let published =
                match tokio::time::timeout(self.publish_timeout, sink.publish(name, payload)).await
                {
                    Ok(published) => published,
                    Err(_) => Err(BrokerError::Timeout {
                        name: name.to_owned(),
                    }),
                };
            if published.is_err() {
                metrics::counter!("pipeline_publish_failures", "sink" => name.to_owned())
                    .increment(1);
            }
            published
        })
        .await
    }
}
