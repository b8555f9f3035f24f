use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{Client, CustomRedisError};

/// In-memory stand-in for Redis. Keys written through `set` are visible to later
/// `get`/`exists` calls, every call is recorded, and individual operations can be made
/// to fail for a given key.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    store: Arc<Mutex<HashMap<String, String>>>,
    get_err: HashMap<String, CustomRedisError>,
    set_err: HashMap<String, CustomRedisError>,
    del_err: HashMap<String, CustomRedisError>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRedisCall {
    pub op: String,
    pub key: String,
    pub value: Option<String>,
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    // Helper methods to safely lock the mutexes
    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockRedisCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, op: &str, key: &str, value: Option<String>) {
        self.lock_calls().push(MockRedisCall {
            op: op.to_string(),
            key: key.to_string(),
            value,
        });
    }

    /// Seed a value without recording a call.
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.lock_store().insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn get_err(mut self, key: &str, err: CustomRedisError) -> Self {
        self.get_err.insert(key.to_owned(), err);
        self
    }

    pub fn set_err(mut self, key: &str, err: CustomRedisError) -> Self {
        self.set_err.insert(key.to_owned(), err);
        self
    }

    pub fn del_err(mut self, key: &str, err: CustomRedisError) -> Self {
        self.del_err.insert(key.to_owned(), err);
        self
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        self.lock_calls().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<MockRedisCall> {
        self.lock_calls()
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.lock_store().get(key).cloned()
    }
}

#[async_trait]
impl Client for MockRedisClient {
    async fn exists(&self, key: String) -> Result<bool, CustomRedisError> {
        self.record("exists", &key, None);
        if let Some(err) = self.get_err.get(&key) {
            return Err(err.clone());
        }
        Ok(self.lock_store().contains_key(&key))
    }

    async fn get(&self, key: String) -> Result<String, CustomRedisError> {
        self.record("get", &key, None);
        if let Some(err) = self.get_err.get(&key) {
            return Err(err.clone());
        }
        self.lock_store()
            .get(&key)
            .cloned()
            .ok_or(CustomRedisError::NotFound)
    }

    async fn set(&self, key: String, value: String) -> Result<(), CustomRedisError> {
        self.record("set", &key, Some(value.clone()));
        if let Some(err) = self.set_err.get(&key) {
            return Err(err.clone());
        }
        self.lock_store().insert(key, value);
        Ok(())
    }

    async fn del(&self, key: String) -> Result<(), CustomRedisError> {
        self.record("del", &key, None);
        if let Some(err) = self.del_err.get(&key) {
            return Err(err.clone());
        }
        self.lock_store().remove(&key);
        Ok(())
    }
}
