//! Blob storage client abstraction for the message pipeline
//!
//! Blobs are opaque text documents grouped by a dataset name and addressed by the id the
//! store hands back on `put`. The trait is implemented by an HTTP client for the storage
//! service and by an in-memory mock that is always available for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod http;
mod mock;

pub use http::HttpBlobStore;
pub use mock::MockBlobStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Blob request failed: {0}")]
    RequestFailed(String),
    #[error("Unexpected status {status} from blob store")]
    UnexpectedStatus { status: u16 },
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for BlobError {
    fn from(err: reqwest::Error) -> Self {
        BlobError::RequestFailed(err.to_string())
    }
}

impl From<serde_json::Error> for BlobError {
    fn from(err: serde_json::Error) -> Self {
        BlobError::ParseError(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    #[serde(rename = "datasetName")]
    pub dataset_name: String,
    pub data: String,
}

/// Blob store trait that both real and mock implementations use
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `dataset_name`, returning the id assigned by the store.
    async fn put(&self, dataset_name: &str, data: &str) -> Result<String, BlobError>;

    /// Fetch a blob by id. `Ok(None)` means the store does not know the id.
    async fn get(&self, id: &str) -> Result<Option<Blob>, BlobError>;

    /// Delete a blob by id, returning whether the store acknowledged the deletion.
    async fn delete(&self, id: &str) -> Result<bool, BlobError>;
}
