use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use common_blob::HttpBlobStore;
use common_kafka::kafka_producer::create_kafka_producer;
use common_redis::RedisClient;
use tracing::info;

use crate::broker::kafka::{KafkaSink, KafkaSource};
use crate::cache::VersionedCache;
use crate::classify::{Classifier, KeyLengthPolicy};
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::transform::VersionedTransformer;

/// Connects the pipeline to Kafka, Redis and the blob store described by `config`.
pub async fn build_pipeline(config: &Config) -> Result<Pipeline<KafkaSource>, Error> {
    let producer = create_kafka_producer(&config.kafka)?;
    let sink = KafkaSink::new(
        producer,
        Duration::from_millis(config.kafka.kafka_message_timeout_ms.into()),
    );
    let source = KafkaSource::new(config.kafka.clone());

    let redis = RedisClient::with_config(
        config.redis_url.clone(),
        Some(Duration::from_millis(config.redis_response_timeout_ms)),
        None,
    )
    .await?;
    info!("Connected to redis");

    let blob_store = HttpBlobStore::new(
        &config.blob_store_url,
        &config.blob_store_uid,
        Duration::from_millis(config.blob_store_timeout_ms),
    )?;

    let classifier = Classifier::new(
        Arc::new(KeyLengthPolicy::default()),
        Arc::new(blob_store),
        config.blob_dataset_name.clone(),
        config.writer(),
    );
    let transformer =
        VersionedTransformer::new(VersionedCache::new(Arc::new(redis)), config.writer());

    Ok(Pipeline::new(
        source,
        Arc::new(sink),
        config.reader(),
        classifier,
        transformer,
    )
    .with_default_timeout(config.default_read_timeout()))
}
