//! Kafka-backed control sender and receiver.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::{Offset, TopicPartitionList};
use tracing::{debug, warn};

use tidemark_events::{codec, Event};

use crate::channel::{
    ChannelError, ChannelFactory, ControlReceiver, ControlRecord, ControlSender,
};

use super::config::KafkaChannelConfig;

/// Timeout for transaction control calls against the broker.
const TXN_TIMEOUT: Duration = Duration::from_secs(30);

/// Transactional producer of control events.
pub struct KafkaControlSender {
    producer: FutureProducer,
    topic: String,
    key: String,
}

impl KafkaControlSender {
    /// Connects the producer and initializes its transactional state.
    ///
    /// Initializing transactions fences any older producer with the
    /// same transactional id.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Publish`] if the producer cannot be
    /// created or transactions cannot be initialized.
    pub fn connect(config: &KafkaChannelConfig) -> Result<Self, ChannelError> {
        let producer: FutureProducer = config
            .producer_config()
            .create()
            .map_err(|e| ChannelError::Publish(format!("failed to create producer: {e}")))?;
        producer
            .init_transactions(TXN_TIMEOUT)
            .map_err(|e| ChannelError::Publish(format!("failed to init transactions: {e}")))?;
        Ok(Self {
            producer,
            topic: config.control_topic.clone(),
            key: config.group_id.clone(),
        })
    }
}

#[async_trait]
impl ControlSender for KafkaControlSender {
    async fn send(&mut self, events: &[Event]) -> Result<(), ChannelError> {
        let encoded: Result<Vec<Vec<u8>>, _> = events.iter().map(codec::encode).collect();
        let encoded = encoded.map_err(|e| ChannelError::Publish(e.to_string()))?;

        self.producer
            .begin_transaction()
            .map_err(|e| ChannelError::Publish(format!("begin transaction: {e}")))?;

        for payload in &encoded {
            let record = FutureRecord::to(&self.topic)
                .payload(payload.as_slice())
                .key(&self.key);
            if let Err((e, _)) = self.producer.send(record, Duration::from_secs(0)).await {
                if let Err(abort) = self.producer.abort_transaction(TXN_TIMEOUT) {
                    warn!(error = %abort, "failed to abort control transaction");
                }
                return Err(ChannelError::Publish(format!("produce failed: {e}")));
            }
        }

        self.producer
            .commit_transaction(TXN_TIMEOUT)
            .map_err(|e| ChannelError::Publish(format!("commit transaction: {e}")))?;
        debug!(events = events.len(), topic = %self.topic, "control transaction committed");
        Ok(())
    }
}

/// Control topic consumer with explicit offset commits.
pub struct KafkaControlReceiver {
    consumer: StreamConsumer,
    topic: String,
    /// Highest delivered offset per control partition, committed as the
    /// durable position (next offset to read) on `commit`.
    delivered: HashMap<i32, i64>,
}

impl KafkaControlReceiver {
    /// Connects the consumer and subscribes to the control topic.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Poll`] if the consumer cannot be created
    /// or the subscription fails.
    pub fn connect(config: &KafkaChannelConfig) -> Result<Self, ChannelError> {
        let consumer: StreamConsumer = config
            .consumer_config()
            .create()
            .map_err(|e| ChannelError::Poll(format!("failed to create consumer: {e}")))?;
        consumer
            .subscribe(&[config.control_topic.as_str()])
            .map_err(|e| ChannelError::Poll(format!("failed to subscribe: {e}")))?;
        Ok(Self {
            consumer,
            topic: config.control_topic.clone(),
            delivered: HashMap::new(),
        })
    }
}

#[async_trait]
impl ControlReceiver for KafkaControlReceiver {
    async fn poll(&mut self, max_wait: Duration) -> Result<Vec<ControlRecord>, ChannelError> {
        let mut records = Vec::new();
        let deadline = tokio::time::Instant::now() + max_wait;

        // Drain until the bounded wait elapses; later messages in the
        // same poll window ride along without extra waiting.
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() && !records.is_empty() {
                break;
            }
            match tokio::time::timeout(remaining, self.consumer.recv()).await {
                Ok(Ok(message)) => {
                    let partition = message.partition();
                    let offset = message.offset();
                    let payload = message.payload().unwrap_or_default().to_vec();
                    self.delivered
                        .entry(partition)
                        .and_modify(|o| *o = (*o).max(offset))
                        .or_insert(offset);
                    records.push(ControlRecord {
                        partition,
                        offset,
                        payload,
                    });
                }
                Ok(Err(e)) => {
                    return Err(ChannelError::Poll(format!("consumer error: {e}")));
                }
                Err(_) => break, // bounded wait elapsed
            }
        }
        Ok(records)
    }

    async fn commit(&mut self) -> Result<(), ChannelError> {
        if self.delivered.is_empty() {
            return Ok(());
        }
        let mut tpl = TopicPartitionList::new();
        for (&partition, &offset) in &self.delivered {
            tpl.add_partition_offset(&self.topic, partition, Offset::Offset(offset + 1))
                .map_err(|e| ChannelError::OffsetCommit(e.to_string()))?;
        }
        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| ChannelError::OffsetCommit(e.to_string()))
    }
}

/// Builds Kafka channel clients from one shared configuration.
pub struct KafkaChannelFactory {
    config: KafkaChannelConfig,
}

impl KafkaChannelFactory {
    /// Creates a factory for the given channel configuration.
    #[must_use]
    pub fn new(config: KafkaChannelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChannelFactory for KafkaChannelFactory {
    async fn sender(&self) -> Result<Box<dyn ControlSender>, ChannelError> {
        Ok(Box::new(KafkaControlSender::connect(&self.config)?))
    }

    async fn receiver(&self) -> Result<Box<dyn ControlReceiver>, ChannelError> {
        Ok(Box::new(KafkaControlReceiver::connect(&self.config)?))
    }
}
