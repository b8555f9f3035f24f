use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{Blob, BlobError, BlobStore};

/// Mock blob store for testing - always available, no conditional compilation needed.
///
/// Ids are sequential (`blob-1`, `blob-2`, ...). Puts into a dataset registered with
/// `fail_puts_for` return the configured error and store nothing.
#[derive(Clone, Default)]
pub struct MockBlobStore {
    blobs: Arc<Mutex<HashMap<String, Blob>>>,
    next_id: Arc<Mutex<u64>>,
    put_failures: HashMap<String, BlobError>,
    put_calls: Arc<Mutex<Vec<Blob>>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts_for(mut self, dataset_name: &str, err: BlobError) -> Self {
        self.put_failures.insert(dataset_name.to_owned(), err);
        self
    }

    pub fn put_calls(&self) -> Vec<Blob> {
        lock(&self.put_calls).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn put(&self, dataset_name: &str, data: &str) -> Result<String, BlobError> {
        let blob = Blob {
            dataset_name: dataset_name.to_owned(),
            data: data.to_owned(),
        };
        lock(&self.put_calls).push(blob.clone());

        if let Some(err) = self.put_failures.get(dataset_name) {
            return Err(err.clone());
        }

        let id = {
            let mut next_id = lock(&self.next_id);
            *next_id += 1;
            format!("blob-{}", *next_id)
        };
        lock(&self.blobs).insert(id.clone(), blob);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Blob>, BlobError> {
        Ok(lock(&self.blobs).get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, BlobError> {
        Ok(lock(&self.blobs).remove(id).is_some())
    }
}
