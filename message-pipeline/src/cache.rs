use std::sync::Arc;

use common_redis::{Client, CustomRedisError};

/// Key-value view of Redis used by the transformer. Absent keys are `None` rather than an
/// error; every other failure is surfaced to the caller.
#[derive(Clone)]
pub struct VersionedCache {
    client: Arc<dyn Client + Send + Sync>,
}

impl VersionedCache {
    pub fn new(client: Arc<dyn Client + Send + Sync>) -> Self {
        Self { client }
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CustomRedisError> {
        self.client.exists(key.to_owned()).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CustomRedisError> {
        match self.client.get(key.to_owned()).await {
            Ok(value) => Ok(Some(value)),
            Err(CustomRedisError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), CustomRedisError> {
        self.client.set(key.to_owned(), value.to_owned()).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), CustomRedisError> {
        self.client.del(key.to_owned()).await
    }
}
