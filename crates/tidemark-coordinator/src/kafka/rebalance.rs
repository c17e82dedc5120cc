//! Rebalance-aware consumer context for the source-topic consumer.
//!
//! rdkafka delivers rebalance callbacks on its background thread, so the
//! context only records the new assignment and marks it pending; the
//! hosting drive loop picks it up with [`KafkaRebalanceContext::take_assignment`]
//! and feeds it to [`CoordinatorRunner::on_assignment`], which keeps
//! coordinator startup and shutdown on the loop that owns them.
//!
//! [`CoordinatorRunner::on_assignment`]: crate::CoordinatorRunner::on_assignment

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rdkafka::consumer::{ConsumerContext, Rebalance};
use rdkafka::{ClientContext, TopicPartitionList};
use tracing::{info, warn};

#[derive(Default)]
struct ContextState {
    assigned: BTreeSet<(String, i32)>,
    pending: Option<Vec<(String, i32)>>,
}

/// Consumer context tracking source-partition assignment changes.
#[derive(Default, Clone)]
pub struct KafkaRebalanceContext {
    state: Arc<Mutex<ContextState>>,
}

impl KafkaRebalanceContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the latest assignment if a rebalance landed since the last
    /// call.
    #[must_use]
    pub fn take_assignment(&self) -> Option<Vec<(String, i32)>> {
        self.state.lock().pending.take()
    }

    fn apply(&self, f: impl FnOnce(&mut BTreeSet<(String, i32)>)) {
        let mut state = self.state.lock();
        f(&mut state.assigned);
        state.pending = Some(state.assigned.iter().cloned().collect());
    }
}

fn partitions_of(tpl: &TopicPartitionList) -> Vec<(String, i32)> {
    tpl.elements()
        .iter()
        .map(|e| (e.topic().to_string(), e.partition()))
        .collect()
}

impl ClientContext for KafkaRebalanceContext {}

impl ConsumerContext for KafkaRebalanceContext {
    fn pre_rebalance(&self, rebalance: &Rebalance<'_>) {
        match rebalance {
            Rebalance::Assign(tpl) => {
                let partitions = partitions_of(tpl);
                info!(
                    partitions_assigned = partitions.len(),
                    "source rebalance: partitions assigned"
                );
                self.apply(|assigned| assigned.extend(partitions));
            }
            Rebalance::Revoke(tpl) => {
                let partitions = partitions_of(tpl);
                info!(
                    partitions_revoked = partitions.len(),
                    "source rebalance: partitions revoked"
                );
                self.apply(|assigned| {
                    for p in &partitions {
                        assigned.remove(p);
                    }
                });
            }
            Rebalance::Error(msg) => {
                warn!(error = %msg, "source rebalance error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_assignment_is_empty_until_a_rebalance() {
        let ctx = KafkaRebalanceContext::new();
        assert!(ctx.take_assignment().is_none());
    }

    #[test]
    fn assignment_accumulates_and_revokes() {
        let ctx = KafkaRebalanceContext::new();
        ctx.apply(|a| a.extend([("events".to_string(), 0), ("events".to_string(), 1)]));
        assert_eq!(ctx.take_assignment().unwrap().len(), 2);
        // Consumed; nothing pending until the next change.
        assert!(ctx.take_assignment().is_none());

        ctx.apply(|a| {
            a.remove(&("events".to_string(), 0));
        });
        assert_eq!(ctx.take_assignment().unwrap(), vec![("events".to_string(), 1)]);
    }
}
