use std::time::Duration;

use crate::config::KafkaConfig;

use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use thiserror::Error;
use tracing::{debug, error, info};

pub fn create_kafka_producer(config: &KafkaConfig) -> Result<FutureProducer, KafkaError> {
    let mut client_config = ClientConfig::new();
    config.apply_connection_settings(&mut client_config);
    client_config
        .set("linger.ms", config.kafka_producer_linger_ms.to_string())
        .set(
            "message.timeout.ms",
            config.kafka_message_timeout_ms.to_string(),
        )
        .set(
            "compression.codec",
            config.kafka_compression_codec.to_owned(),
        )
        .set("acks", "all");

    debug!("rdkafka configuration: {:?}", client_config);
    let api: FutureProducer = client_config.create()?;

    // "Ping" the Kafka brokers by requesting metadata
    match api
        .client()
        .fetch_metadata(None, std::time::Duration::from_secs(15))
    {
        Ok(metadata) => {
            info!(
                "Successfully connected to Kafka brokers. Found {} topics.",
                metadata.topics().len()
            );
        }
        Err(error) => {
            error!("Failed to fetch metadata from Kafka brokers: {:?}", error);
            return Err(error);
        }
    }

    Ok(api)
}

#[derive(Error, Debug)]
pub enum KafkaProduceError {
    #[error("failed to produce to kafka: {error}")]
    KafkaProduceError { error: KafkaError },
    #[error("failed to produce to kafka (timeout)")]
    KafkaProduceCanceled,
}

/// Publishes one already-serialized payload and waits for the broker acknowledgement.
pub async fn send_text_to_kafka(
    kafka_producer: &FutureProducer,
    topic: &str,
    payload: &str,
    timeout: Duration,
) -> Result<(), KafkaProduceError> {
    let record: FutureRecord<'_, (), str> = FutureRecord::to(topic).payload(payload);

    match kafka_producer.send(record, Timeout::After(timeout)).await {
        Ok(_) => Ok(()),
        Err((KafkaError::Canceled, _)) => Err(KafkaProduceError::KafkaProduceCanceled),
        Err((error, _)) => Err(KafkaProduceError::KafkaProduceError { error }),
    }
}
