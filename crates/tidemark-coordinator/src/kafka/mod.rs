//! Kafka control channel backend.
//!
//! Implements the [`channel`](crate::channel) traits over rdkafka: a
//! transactional producer for control events, a stream consumer with
//! durable group offsets, and a rebalance-aware consumer context that
//! surfaces source-partition assignments to the hosting loop.

mod channel;
mod config;
mod rebalance;

pub use channel::{KafkaChannelFactory, KafkaControlReceiver, KafkaControlSender};
pub use config::KafkaChannelConfig;
pub use rebalance::KafkaRebalanceContext;
