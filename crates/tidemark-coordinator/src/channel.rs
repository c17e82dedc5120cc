//! Control channel adapter traits.
//!
//! The coordinator never talks to the message bus directly; it goes
//! through these object-safe traits. A backend must provide transactional
//! publish (all events of one [`ControlSender::send`] call become visible
//! atomically and in publish order) and bounded-wait consumption with a
//! durable, explicitly advanced consumer position.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use tidemark_events::Event;

/// Errors from a control channel backend.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Transactional publish failed. Fatal to the current commit cycle.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Polling for control events failed.
    #[error("poll failed: {0}")]
    Poll(String),

    /// Advancing the durable consumer position failed.
    #[error("offset commit failed: {0}")]
    OffsetCommit(String),
}

/// One consumed control-channel record, still in wire form.
///
/// Decoding is left to the consumer so malformed or foreign records can
/// be skipped without failing the poll.
#[derive(Debug, Clone)]
pub struct ControlRecord {
    /// Control topic partition the record came from.
    pub partition: i32,
    /// Offset of the record within its partition.
    pub offset: i64,
    /// Encoded event bytes.
    pub payload: Vec<u8>,
}

/// Transactional producer of control events.
#[async_trait]
pub trait ControlSender: Send {
    /// Publishes the given events as one atomic transaction.
    ///
    /// A reader observes either all of the events, in order, or none of
    /// them. No retries beyond the transport's own semantics.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Publish`] if the transaction did not
    /// commit; the caller must treat the cycle as aborted.
    async fn send(&mut self, events: &[Event]) -> Result<(), ChannelError>;
}

/// Consumer of control events with durable offset tracking.
#[async_trait]
pub trait ControlReceiver: Send {
    /// Polls for new records, waiting at most `max_wait`.
    ///
    /// Returns records in publish order per partition; there is no
    /// cross-partition ordering guarantee. An empty vec is a normal
    /// outcome of a quiet channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Poll`] on transport failure.
    async fn poll(&mut self, max_wait: Duration) -> Result<Vec<ControlRecord>, ChannelError>;

    /// Durably advances the consumer position past every record returned
    /// so far, so a successor resumes after them.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::OffsetCommit`] on transport failure.
    async fn commit(&mut self) -> Result<(), ChannelError>;
}

/// Builds control channel clients for a coordinator instance.
///
/// Supplied by the hosting connector; a fresh sender/receiver pair is
/// created each time leadership is acquired.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    /// Creates a transactional sender for the control topic.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] if the client cannot be constructed.
    async fn sender(&self) -> Result<Box<dyn ControlSender>, ChannelError>;

    /// Creates a receiver positioned at the durable consumer position.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] if the client cannot be constructed.
    async fn receiver(&self) -> Result<Box<dyn ControlReceiver>, ChannelError>;
}
