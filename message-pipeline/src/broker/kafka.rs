use std::time::Duration;

use async_trait::async_trait;
use common_kafka::config::{ConsumerConfig, KafkaConfig};
use common_kafka::kafka_consumer::{RecvErr, SingleTopicConsumer};
use common_kafka::kafka_producer::{send_text_to_kafka, KafkaProduceError};
use rdkafka::producer::FutureProducer;
use tracing::{debug, warn};

use super::{BrokerError, BrokerSink, BrokerSource, RawRecord};

/// Reads topics through a fresh consumer (and consumer group) per subscription.
pub struct KafkaSource {
    config: KafkaConfig,
}

pub struct KafkaSubscription {
    consumer: SingleTopicConsumer,
}

impl KafkaSource {
    pub fn new(config: KafkaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrokerSource for KafkaSource {
    type Subscription = KafkaSubscription;

    async fn subscribe(&self, name: &str) -> Result<KafkaSubscription, BrokerError> {
        let consumer = SingleTopicConsumer::new(&self.config, ConsumerConfig::ephemeral(name))
            .map_err(|e| BrokerError::Subscribe {
                name: name.to_owned(),
                reason: e.to_string(),
            })?;
        debug!("Subscribed to topic {}", name);
        Ok(KafkaSubscription { consumer })
    }

    // Hands back at most one record per poll, so a reader whose count is satisfied never
    // pulls records past the ones it keeps.
    async fn poll(
        &self,
        subscription: &mut KafkaSubscription,
        max_wait: Duration,
    ) -> Result<Vec<RawRecord>, BrokerError> {
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            match tokio::time::timeout_at(deadline, subscription.consumer.text_recv()).await {
                Err(_) => return Ok(Vec::new()),
                Ok(Ok(payload)) => return Ok(vec![RawRecord::new(payload)]),
                Ok(Err(RecvErr::Kafka(e))) => {
                    return Err(BrokerError::Poll {
                        name: subscription.consumer.topic().to_owned(),
                        reason: e.to_string(),
                    })
                }
                Ok(Err(e)) => {
                    warn!(
                        "Skipping unreadable record on {}: {}",
                        subscription.consumer.topic(),
                        e
                    );
                }
            }
        }
    }

    async fn unsubscribe(&self, subscription: KafkaSubscription) {
        debug!("Unsubscribing from topic {}", subscription.consumer.topic());
        subscription.consumer.unsubscribe();
    }
}

/// Publishes through a shared producer; librdkafka pools broker connections internally.
pub struct KafkaSink {
    producer: FutureProducer,
    delivery_timeout: Duration,
}

impl KafkaSink {
    pub fn new(producer: FutureProducer, delivery_timeout: Duration) -> Self {
        Self {
            producer,
            delivery_timeout,
        }
    }
}

#[async_trait]
impl BrokerSink for KafkaSink {
    async fn publish(&self, name: &str, payload: &str) -> Result<(), BrokerError> {
        send_text_to_kafka(&self.producer, name, payload, self.delivery_timeout)
            .await
            .map_err(|e| match e {
                KafkaProduceError::KafkaProduceCanceled => BrokerError::Timeout {
                    name: name.to_owned(),
                },
                KafkaProduceError::KafkaProduceError { error } => BrokerError::Publish {
                    name: name.to_owned(),
                    reason: error.to_string(),
                },
            })
    }
}
