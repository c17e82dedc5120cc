//! Kafka channel configuration.

use std::collections::HashMap;

use rdkafka::ClientConfig;

/// Connection settings for the Kafka control channel.
#[derive(Debug, Clone)]
pub struct KafkaChannelConfig {
    /// Broker bootstrap list.
    pub bootstrap_servers: String,
    /// Control topic name.
    pub control_topic: String,
    /// Consumer group id for the control consumer.
    pub group_id: String,
    /// Transactional id for the control producer.
    ///
    /// Must be unique per coordinator deployment; Kafka fences older
    /// producers sharing the id, which is what keeps an abandoned leader
    /// from publishing into a successor's cycle.
    pub transactional_id: String,
    /// Additional client properties passed through verbatim.
    pub properties: HashMap<String, String>,
}

impl KafkaChannelConfig {
    /// Creates a config with the required settings and no overrides.
    #[must_use]
    pub fn new(
        bootstrap_servers: impl Into<String>,
        control_topic: impl Into<String>,
        group_id: impl Into<String>,
        transactional_id: impl Into<String>,
    ) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            control_topic: control_topic.into(),
            group_id: group_id.into(),
            transactional_id: transactional_id.into(),
            properties: HashMap::new(),
        }
    }

    /// Builds the rdkafka producer configuration.
    #[must_use]
    pub fn producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("transactional.id", &self.transactional_id)
            .set("enable.idempotence", "true");
        for (key, value) in &self.properties {
            config.set(key, value);
        }
        config
    }

    /// Builds the rdkafka consumer configuration.
    ///
    /// Auto-commit stays off; the receiver commits its position
    /// explicitly at cycle close.
    #[must_use]
    pub fn consumer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .set("isolation.level", "read_committed");
        for (key, value) in &self.properties {
            config.set(key, value);
        }
        config
    }
}
