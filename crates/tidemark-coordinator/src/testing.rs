//! In-memory channel for tests and embedded use.
//!
//! [`InMemoryChannel`] plays both sides of the control topic: the sender
//! appends encoded events to a shared history (one simulated transaction
//! per `send` call) and the receiver drains records injected with
//! [`InMemoryChannel::push_record`]. Tests decode the history to assert
//! on exact message sequences.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use tidemark_events::{codec, Event};

use crate::channel::{
    ChannelError, ChannelFactory, ControlReceiver, ControlRecord, ControlSender,
};

#[derive(Default)]
struct ChannelInner {
    history: Vec<Vec<u8>>,
    pending: VecDeque<ControlRecord>,
    transactions_committed: u64,
    committed_through: Option<i64>,
    fail_next_send: bool,
    delivered_high_water: Option<i64>,
}

/// Shared in-memory control channel.
///
/// Clones share state, so a test can hold one clone while the
/// coordinator owns sender and receiver halves built from another.
#[derive(Clone, Default)]
pub struct InMemoryChannel {
    inner: Arc<Mutex<ChannelInner>>,
}

impl InMemoryChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a consumer record carrying the given event.
    ///
    /// # Panics
    ///
    /// Panics if the event cannot be encoded (test-harness convenience).
    pub fn push_event(&self, partition: i32, offset: i64, event: &Event) {
        let payload = codec::encode(event).expect("event encodes");
        self.push_record(partition, offset, payload);
    }

    /// Injects a raw consumer record.
    pub fn push_record(&self, partition: i32, offset: i64, payload: Vec<u8>) {
        self.inner.lock().pending.push_back(ControlRecord {
            partition,
            offset,
            payload,
        });
    }

    /// Every byte payload published so far, in publish order.
    #[must_use]
    pub fn history(&self) -> Vec<Vec<u8>> {
        self.inner.lock().history.clone()
    }

    /// Decoded view of the publish history.
    ///
    /// # Panics
    ///
    /// Panics if any published payload fails to decode.
    #[must_use]
    pub fn decoded_history(&self) -> Vec<Event> {
        self.history()
            .iter()
            .map(|bytes| codec::decode(bytes).expect("published event decodes"))
            .collect()
    }

    /// Number of committed producer transactions.
    #[must_use]
    pub fn transactions_committed(&self) -> u64 {
        self.inner.lock().transactions_committed
    }

    /// The offset the receiver has durably committed through, if any.
    #[must_use]
    pub fn committed_through(&self) -> Option<i64> {
        self.inner.lock().committed_through
    }

    /// Makes the next `send` call fail its transaction.
    pub fn fail_next_send(&self) {
        self.inner.lock().fail_next_send = true;
    }
}

#[async_trait]
impl ChannelFactory for InMemoryChannel {
    async fn sender(&self) -> Result<Box<dyn ControlSender>, ChannelError> {
        Ok(Box::new(InMemorySender {
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn receiver(&self) -> Result<Box<dyn ControlReceiver>, ChannelError> {
        Ok(Box::new(InMemoryReceiver {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct InMemorySender {
    inner: Arc<Mutex<ChannelInner>>,
}

#[async_trait]
impl ControlSender for InMemorySender {
    async fn send(&mut self, events: &[Event]) -> Result<(), ChannelError> {
        let encoded: Result<Vec<Vec<u8>>, _> = events.iter().map(codec::encode).collect();
        let encoded = encoded.map_err(|e| ChannelError::Publish(e.to_string()))?;

        let mut inner = self.inner.lock();
        if inner.fail_next_send {
            inner.fail_next_send = false;
            return Err(ChannelError::Publish("injected transaction failure".into()));
        }
        // All-or-nothing: the batch lands atomically.
        inner.history.extend(encoded);
        inner.transactions_committed += 1;
        Ok(())
    }
}

struct InMemoryReceiver {
    inner: Arc<Mutex<ChannelInner>>,
}

#[async_trait]
impl ControlReceiver for InMemoryReceiver {
    async fn poll(&mut self, _max_wait: Duration) -> Result<Vec<ControlRecord>, ChannelError> {
        let mut inner = self.inner.lock();
        let records: Vec<ControlRecord> = inner.pending.drain(..).collect();
        if let Some(last) = records.last() {
            inner.delivered_high_water = Some(last.offset);
        }
        Ok(records)
    }

    async fn commit(&mut self) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        inner.committed_through = inner.delivered_high_water;
        Ok(())
    }
}
