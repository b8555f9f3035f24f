use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod kafka;
pub mod memory;

/// An opaque text payload as delivered by a broker source. Nothing about its structure is
/// assumed until a pipeline stage parses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord(String);

impl RawRecord {
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    pub fn payload(&self) -> &str {
        &self.0
    }

    pub fn into_payload(self) -> String {
        self.0
    }
}

impl From<&str> for RawRecord {
    fn from(payload: &str) -> Self {
        Self::new(payload)
    }
}

impl From<String> for RawRecord {
    fn from(payload: String) -> Self {
        Self(payload)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("failed to subscribe to {name}: {reason}")]
    Subscribe { name: String, reason: String },
    #[error("failed to poll {name}: {reason}")]
    Poll { name: String, reason: String },
    #[error("failed to publish to {name}: {reason}")]
    Publish { name: String, reason: String },
    #[error("publish to {name} timed out")]
    Timeout { name: String },
}

/// A topic or queue that records can be pulled from.
///
/// A subscription lives for the duration of one bounded read: it is created by
/// `subscribe`, polled any number of times, and handed back to `unsubscribe`.
#[async_trait]
pub trait BrokerSource: Send + Sync {
    type Subscription: Send;

    async fn subscribe(&self, name: &str) -> Result<Self::Subscription, BrokerError>;

    /// Returns the records that became available within `max_wait`, possibly none.
    async fn poll(
        &self,
        subscription: &mut Self::Subscription,
        max_wait: Duration,
    ) -> Result<Vec<RawRecord>, BrokerError>;

    async fn unsubscribe(&self, subscription: Self::Subscription);
}

/// A topic or queue that accepts one record at a time.
#[async_trait]
pub trait BrokerSink: Send + Sync {
    /// Publishes a single payload, returning once the broker acknowledged it.
    async fn publish(&self, name: &str, payload: &str) -> Result<(), BrokerError>;
}
