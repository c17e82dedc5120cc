//! Partition ownership tracking and leader derivation.
//!
//! Rebalance callbacks arrive on a transport background thread while the
//! coordinator reads assignment state from its own loop, so the owned
//! set is modelled as an immutable [`AssignmentSnapshot`] swapped
//! atomically under one mutex. The coordinator reads one consistent
//! snapshot per decision point, never live mutable state mid-computation.
//!
//! Leadership is derived, not elected: the process owning the designated
//! partition (partition 0 of the first source topic) is the leader.
//! [`PartitionOwnership::replace`] returns an explicit
//! [`LeaderTransition`] so the hosting connector can start or stop the
//! coordinator without a live message-bus connection in tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// Immutable snapshot of the source-topic partitions owned by this
/// process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSnapshot {
    partitions: BTreeSet<(String, i32)>,
}

impl AssignmentSnapshot {
    /// Builds a snapshot from `(topic, partition)` pairs.
    #[must_use]
    pub fn new(partitions: impl IntoIterator<Item = (String, i32)>) -> Self {
        Self {
            partitions: partitions.into_iter().collect(),
        }
    }

    /// Returns `true` if the given topic-partition is owned.
    #[must_use]
    pub fn contains(&self, topic: &str, partition: i32) -> bool {
        self.partitions
            .contains(&(topic.to_string(), partition))
    }

    /// Iterates the owned `(topic, partition)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, i32)> {
        self.partitions.iter()
    }

    /// Number of owned partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Returns `true` when nothing is owned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Outcome of applying a new assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderTransition {
    /// Leadership unchanged.
    NoOp,
    /// This process now owns the designated partition.
    BecomeLeader,
    /// This process lost the designated partition.
    ResignLeader,
}

/// Pure transition function from previous and next leadership.
#[must_use]
pub fn leader_transition(was_leader: bool, is_leader: bool) -> LeaderTransition {
    match (was_leader, is_leader) {
        (false, true) => LeaderTransition::BecomeLeader,
        (true, false) => LeaderTransition::ResignLeader,
        _ => LeaderTransition::NoOp,
    }
}

/// Shared, thread-safe partition ownership tracker.
///
/// Clones share state; the rebalance callback holds one clone and the
/// coordinator another.
#[derive(Debug, Clone)]
pub struct PartitionOwnership {
    designated: (String, i32),
    current: Arc<Mutex<AssignmentSnapshot>>,
}

impl PartitionOwnership {
    /// Creates a tracker with the given designated leader partition and
    /// an empty assignment.
    #[must_use]
    pub fn new(designated_topic: impl Into<String>, designated_partition: i32) -> Self {
        Self {
            designated: (designated_topic.into(), designated_partition),
            current: Arc::new(Mutex::new(AssignmentSnapshot::default())),
        }
    }

    /// Atomically replaces the owned set and returns the leadership
    /// transition it caused.
    pub fn replace(
        &self,
        partitions: impl IntoIterator<Item = (String, i32)>,
    ) -> LeaderTransition {
        let next = AssignmentSnapshot::new(partitions);
        let next_leader = next.contains(&self.designated.0, self.designated.1);

        let mut current = self.current.lock();
        let was_leader = current.contains(&self.designated.0, self.designated.1);
        *current = next;
        drop(current);

        let transition = leader_transition(was_leader, next_leader);
        if transition != LeaderTransition::NoOp {
            info!(
                topic = %self.designated.0,
                partition = self.designated.1,
                transition = ?transition,
                "leadership transition"
            );
        }
        transition
    }

    /// Returns one consistent snapshot of the owned set.
    #[must_use]
    pub fn snapshot(&self) -> AssignmentSnapshot {
        self.current.lock().clone()
    }

    /// Returns `true` iff the designated partition is currently owned.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.current
            .lock()
            .contains(&self.designated.0, self.designated.1)
    }
}
