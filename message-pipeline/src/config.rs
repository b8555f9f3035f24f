use std::time::Duration;

use common_kafka::config::KafkaConfig;
use envconfig::Envconfig;

use crate::reader::BoundedReader;
use crate::retry::RetryPolicy;
use crate::writer::ReliableWriter;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "::")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3310")]
    pub port: u16,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(default = "redis://localhost:6379/")]
    pub redis_url: String,

    #[envconfig(default = "100")]
    pub redis_response_timeout_ms: u64,

    #[envconfig(default = "http://localhost:8000")]
    pub blob_store_url: String,

    #[envconfig(default = "message-pipeline")]
    pub blob_store_uid: String,

    #[envconfig(default = "5000")]
    pub blob_store_timeout_ms: u64,

    #[envconfig(default = "accepted-messages")]
    pub blob_dataset_name: String,

    #[envconfig(default = "10")]
    pub read_poll_interval_ms: u64,

    // Applied when a request names neither a message count nor a timeout
    pub read_timeout_ms: Option<u64>,

    #[envconfig(default = "1000")]
    pub publish_timeout_ms: u64,

    #[envconfig(default = "5")]
    pub publish_max_attempts: u32,

    #[envconfig(default = "10")]
    pub publish_retry_backoff_ms: u64,
}

impl Config {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reader(&self) -> BoundedReader {
        BoundedReader::new(Duration::from_millis(self.read_poll_interval_ms))
    }

    pub fn writer(&self) -> ReliableWriter {
        ReliableWriter::new(
            RetryPolicy::new(
                self.publish_max_attempts,
                Duration::from_millis(self.publish_retry_backoff_ms),
            ),
            Duration::from_millis(self.publish_timeout_ms),
        )
    }

    pub fn default_read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}
