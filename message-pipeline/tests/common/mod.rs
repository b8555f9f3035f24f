#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use common_blob::MockBlobStore;
use common_redis::MockRedisClient;
use message_pipeline::broker::memory::MemoryBroker;
use message_pipeline::cache::VersionedCache;
use message_pipeline::classify::{Classifier, KeyLengthPolicy};
use message_pipeline::pipeline::Pipeline;
use message_pipeline::reader::BoundedReader;
use message_pipeline::retry::RetryPolicy;
use message_pipeline::transform::VersionedTransformer;
use message_pipeline::writer::ReliableWriter;
use serde_json::Value;

pub struct Harness {
    pub broker: MemoryBroker,
    pub redis: MockRedisClient,
    pub blobs: MockBlobStore,
    pub pipeline: Pipeline<MemoryBroker>,
}

pub fn harness() -> Harness {
    harness_with(MockRedisClient::new(), MockBlobStore::new())
}

pub fn harness_with(redis: MockRedisClient, blobs: MockBlobStore) -> Harness {
    let broker = MemoryBroker::new();
    let writer = ReliableWriter::new(
        RetryPolicy::new(3, Duration::from_millis(1)),
        Duration::from_secs(1),
    );

    let classifier = Classifier::new(
        Arc::new(KeyLengthPolicy::default()),
        Arc::new(blobs.clone()),
        "accepted".to_string(),
        writer.clone(),
    );
    let transformer =
        VersionedTransformer::new(VersionedCache::new(Arc::new(redis.clone())), writer);

    let pipeline = Pipeline::new(
        broker.clone(),
        Arc::new(broker.clone()),
        BoundedReader::new(Duration::from_millis(10)),
        classifier,
        transformer,
    );

    Harness {
        broker,
        redis,
        blobs,
        pipeline,
    }
}

pub fn published(broker: &MemoryBroker, name: &str) -> Vec<Value> {
    broker
        .records(name)
        .iter()
        .map(|record| serde_json::from_str(record).unwrap())
        .collect()
}
