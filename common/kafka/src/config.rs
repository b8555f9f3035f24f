use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct KafkaConfig {
    #[envconfig(default = "0")]
    pub kafka_producer_linger_ms: u32, // Records are published one at a time, so don't hold them back

    #[envconfig(default = "10000")]
    pub kafka_message_timeout_ms: u32, // Time before librdkafka gives up on a single delivery

    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,

    // Bounded reads start from the beginning of the topic unless told otherwise
    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String, // earliest, latest

    #[envconfig(default = "true")]
    pub kafka_consumer_auto_commit: bool,

    pub kafka_security_protocol: Option<String>,
    pub kafka_sasl_mechanism: Option<String>,
    pub kafka_sasl_username: Option<String>,
    pub kafka_sasl_password: Option<String>,
}

/// Settings for one short-lived consumer. Every bounded read gets its own group, so
/// subscriptions never share offsets or partition assignments.
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub kafka_consumer_group: String,
    pub kafka_consumer_topic: String,
}

impl ConsumerConfig {
    pub fn ephemeral(topic: &str) -> Self {
        Self {
            kafka_consumer_group: format!("message-pipeline-{}", uuid::Uuid::new_v4()),
            kafka_consumer_topic: topic.to_owned(),
        }
    }
}

impl KafkaConfig {
    /// Applies the connection settings shared by producers and consumers.
    pub fn apply_connection_settings(&self, client_config: &mut rdkafka::ClientConfig) {
        client_config.set("bootstrap.servers", &self.kafka_hosts);

        if self.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        if let Some(protocol) = &self.kafka_security_protocol {
            client_config.set("security.protocol", protocol);
        }
        if let Some(mechanism) = &self.kafka_sasl_mechanism {
            client_config.set("sasl.mechanism", mechanism);
        }
        if let (Some(username), Some(password)) =
            (&self.kafka_sasl_username, &self.kafka_sasl_password)
        {
            client_config
                .set("sasl.username", username)
                .set("sasl.password", password);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> KafkaConfig {
        KafkaConfig {
            kafka_producer_linger_ms: 0,
            kafka_message_timeout_ms: 1000,
            kafka_compression_codec: "none".to_string(),
            kafka_tls: false,
            kafka_hosts: "broker:9092".to_string(),
            kafka_consumer_offset_reset: "earliest".to_string(),
            kafka_consumer_auto_commit: true,
            kafka_security_protocol: None,
            kafka_sasl_mechanism: None,
            kafka_sasl_username: None,
            kafka_sasl_password: None,
        }
    }

    #[test]
    fn test_ephemeral_consumer_groups_are_unique() {
        let a = ConsumerConfig::ephemeral("events");
        let b = ConsumerConfig::ephemeral("events");
        assert_eq!(a.kafka_consumer_topic, "events");
        assert_ne!(a.kafka_consumer_group, b.kafka_consumer_group);
    }

    #[test]
    fn test_connection_settings_plain() {
        let mut client_config = rdkafka::ClientConfig::new();
        config().apply_connection_settings(&mut client_config);
        assert_eq!(client_config.get("bootstrap.servers"), Some("broker:9092"));
        assert_eq!(client_config.get("security.protocol"), None);
    }

    #[test]
    fn test_connection_settings_sasl() {
        let mut config = config();
        config.kafka_security_protocol = Some("SASL_SSL".to_string());
        config.kafka_sasl_mechanism = Some("PLAIN".to_string());
        config.kafka_sasl_username = Some("user".to_string());
        config.kafka_sasl_password = Some("secret".to_string());

        let mut client_config = rdkafka::ClientConfig::new();
        config.apply_connection_settings(&mut client_config);
        assert_eq!(client_config.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(client_config.get("sasl.mechanism"), Some("PLAIN"));
        assert_eq!(client_config.get("sasl.username"), Some("user"));
    }
}
