use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    ClientConfig, Message,
};
use tracing::debug;

use crate::config::{ConsumerConfig, KafkaConfig};

/// A consumer bound to exactly one topic for the lifetime of the value. Dropping it
/// closes the underlying librdkafka handle and leaves the group.
pub struct SingleTopicConsumer {
    consumer: StreamConsumer,
    topic: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RecvErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Received empty payload")]
    Empty,
}

impl SingleTopicConsumer {
    pub fn new(
        common_config: &KafkaConfig,
        consumer_config: ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        common_config.apply_connection_settings(&mut client_config);
        client_config
            .set("group.id", &consumer_config.kafka_consumer_group)
            .set(
                "auto.offset.reset",
                &common_config.kafka_consumer_offset_reset,
            )
            .set(
                "enable.auto.commit",
                common_config.kafka_consumer_auto_commit.to_string(),
            );

        debug!("rdkafka consumer configuration: {:?}", client_config);
        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;

        Ok(Self {
            consumer,
            topic: consumer_config.kafka_consumer_topic,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next message and returns its payload as text.
    pub async fn text_recv(&self) -> Result<String, RecvErr> {
        let message = self.consumer.recv().await?;

        let Some(payload) = message.payload() else {
            return Err(RecvErr::Empty);
        };

        Ok(std::str::from_utf8(payload)?.to_owned())
    }

    pub fn unsubscribe(self) {
        self.consumer.unsubscribe();
    }
}
