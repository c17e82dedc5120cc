//! The commit-cycle state machine.
//!
//! One logical state: `Idle` (no [`CommitState`]) or `CycleOpen` (a live
//! one). The coordinator owns its channel clients and the per-cycle
//! state exclusively; `process()` is the single processing loop and the
//! only mutator, so no internal locking is needed.
//!
//! ## Cycle
//!
//! 1. Interval elapsed and this process is leader — mint a commit id,
//!    publish `StartCommit` in its own transaction, snapshot the
//!    assignment into the expected-partition set.
//! 2. Each `process()` call polls the control channel and folds matching
//!    `DataWritten`/`DataComplete` replies into the cycle. Stale or
//!    unknown commit ids are ignored (duplicate-delivery tolerance).
//! 3. On completeness or commit timeout, commit each table that
//!    accumulated files (failures skip that table only), then always
//!    publish `CommitComplete` and return to `Idle`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use tidemark_events::{codec, CommitId, Event, Payload};
use tidemark_table::Catalog;

use crate::channel::{ControlReceiver, ControlRecord, ControlSender};
use crate::commit_state::CommitState;
use crate::committer::TableCommitter;
use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::ownership::PartitionOwnership;

/// The commit coordinator. One instance runs per elected leader.
pub struct Coordinator {
    config: CoordinatorConfig,
    committer: TableCommitter,
    ownership: PartitionOwnership,
    sender: Box<dyn ControlSender>,
    receiver: Box<dyn ControlReceiver>,
    /// `Some` while a cycle is open.
    state: Option<CommitState>,
    /// Baseline for the commit-interval tick.
    last_closed_at: Instant,
    running: bool,
}

impl Coordinator {
    /// Creates a coordinator over the given catalog, ownership handle,
    /// and control channel clients.
    #[must_use]
    pub fn new(
        config: CoordinatorConfig,
        catalog: Arc<dyn Catalog>,
        ownership: PartitionOwnership,
        sender: Box<dyn ControlSender>,
        receiver: Box<dyn ControlReceiver>,
    ) -> Self {
        Self {
            config,
            committer: TableCommitter::new(catalog),
            ownership,
            sender,
            receiver,
            state: None,
            last_closed_at: Instant::now(),
            running: false,
        }
    }

    /// Starts the coordinator; the first interval tick counts from here.
    pub fn start(&mut self) {
        self.running = true;
        self.last_closed_at = Instant::now();
        info!(group = %self.config.group, "coordinator started");
    }

    /// Stops the coordinator, discarding any in-flight cycle without
    /// committing.
    ///
    /// An abandoned cycle's accumulated files are dropped; the next
    /// elected leader starts fresh from the channel's durable consumer
    /// position.
    pub fn stop(&mut self) {
        if let Some(state) = self.state.take() {
            warn!(
                commit_id = %state.commit_id(),
                "abandoning open commit cycle without committing"
            );
        }
        self.running = false;
        info!(group = %self.config.group, "coordinator stopped");
    }

    /// Returns `true` while a commit cycle is open.
    #[must_use]
    pub fn cycle_open(&self) -> bool {
        self.state.is_some()
    }

    /// Runs one poll-and-act iteration.
    ///
    /// Callable repeatedly by a driver; never blocks longer than the
    /// configured poll timeout plus commit work.
    ///
    /// # Errors
    ///
    /// Returns a [`CoordinatorError`] on channel failure. A failed
    /// publish aborts the current cycle only; the coordinator stays
    /// usable and the next interval tick starts a fresh cycle.
    pub async fn process(&mut self) -> Result<(), CoordinatorError> {
        if !self.running {
            return Err(CoordinatorError::NotRunning);
        }

        if self.state.is_none()
            && self.ownership.is_leader()
            && self.last_closed_at.elapsed() >= self.config.commit_interval
        {
            self.open_cycle().await?;
        }

        let records = self.receiver.poll(self.config.poll_timeout).await?;
        for record in records {
            self.dispatch(&record);
        }

        if let Some(state) = self.state.take() {
            let timed_out = state.timed_out(self.config.commit_timeout);
            if state.complete() || timed_out {
                let result = self.close_cycle(state, timed_out).await;
                self.last_closed_at = Instant::now();
                result?;
            } else {
                self.state = Some(state);
            }
        }

        Ok(())
    }

    /// Opens a new cycle: mints a commit id, publishes `StartCommit` in
    /// its own transaction, and snapshots the current assignment.
    async fn open_cycle(&mut self) -> Result<(), CoordinatorError> {
        let commit_id = CommitId::random();
        self.sender
            .send(&[Event::new(
                &self.config.group,
                Payload::StartCommit { commit_id },
            )])
            .await?;

        let assignment = self.ownership.snapshot();
        let expected: BTreeSet<(String, i32)> = assignment
            .iter()
            .filter(|(topic, _)| self.config.source_topics.contains(topic))
            .cloned()
            .collect();

        info!(
            commit_id = %commit_id,
            expected_partitions = expected.len(),
            "commit cycle started"
        );
        self.state = Some(CommitState::new(commit_id, expected));
        Ok(())
    }

    /// Folds one control record into the open cycle, if any.
    fn dispatch(&mut self, record: &ControlRecord) {
        let event = match codec::decode(&record.payload) {
            Ok(event) => event,
            Err(error) => {
                warn!(
                    partition = record.partition,
                    offset = record.offset,
                    %error,
                    "skipping malformed control record"
                );
                return;
            }
        };
        if event.group != self.config.group {
            debug!(group = %event.group, "ignoring event from foreign group");
            return;
        }

        let open_id = match (&self.state, event.payload.commit_id()) {
            (Some(state), Some(id)) if state.commit_id() == id => id,
            _ => {
                // Stale, unknown, or no cycle open: a previous cycle
                // already closed or the transport re-delivered.
                debug!(
                    payload = %event.payload.payload_type(),
                    "ignoring event outside the open cycle"
                );
                return;
            }
        };

        match event.payload {
            Payload::DataWritten {
                table,
                data_files,
                delete_files,
                ..
            } => {
                debug!(
                    commit_id = %open_id,
                    table = %table,
                    data_files = data_files.len(),
                    delete_files = delete_files.len(),
                    "writer reported files"
                );
                if let Some(state) = self.state.as_mut() {
                    state.data_written(table, data_files, delete_files);
                }
            }
            Payload::DataComplete { watermarks, .. } => {
                if let Some(state) = self.state.as_mut() {
                    state.data_complete(watermarks);
                }
            }
            // The coordinator's own output, echoed back by the channel.
            Payload::StartCommit { .. }
            | Payload::CommitToTable { .. }
            | Payload::CommitComplete { .. }
            | Payload::Unknown => {}
        }
    }

    /// Closes the cycle: commits each table with accumulated files, then
    /// always publishes `CommitComplete` and advances the durable
    /// control-channel position.
    async fn close_cycle(
        &mut self,
        state: CommitState,
        timed_out: bool,
    ) -> Result<(), CoordinatorError> {
        let commit_id = state.commit_id();
        if timed_out && !state.complete() {
            warn!(
                commit_id = %commit_id,
                missing = ?state.missing_partitions(),
                "commit timeout reached, closing with partial results"
            );
        }

        let offsets_json = state.offsets_json();
        let valid_through = state.valid_through();
        let mut committed = 0_usize;
        let mut skipped = 0_usize;

        for (table_ref, files) in state.tables() {
            if files.is_empty() {
                continue;
            }
            match self
                .committer
                .commit_table(commit_id, table_ref, files, &offsets_json, valid_through)
                .await
            {
                Ok(snapshot) => {
                    committed += 1;
                    info!(
                        commit_id = %commit_id,
                        table = %table_ref,
                        snapshot_id = snapshot.snapshot_id,
                        "table committed"
                    );
                    self.sender
                        .send(&[Event::new(
                            &self.config.group,
                            Payload::CommitToTable {
                                commit_id,
                                table: table_ref.clone(),
                                valid_through,
                            },
                        )])
                        .await?;
                }
                Err(error) => {
                    skipped += 1;
                    warn!(
                        commit_id = %commit_id,
                        table = %table_ref,
                        %error,
                        "table commit failed, skipping table"
                    );
                }
            }
        }

        // Completion must always be signalled, even with nothing
        // committed, so writers can advance their tracked offsets.
        self.sender
            .send(&[Event::new(
                &self.config.group,
                Payload::CommitComplete {
                    commit_id,
                    valid_through,
                },
            )])
            .await?;
        self.receiver.commit().await?;

        info!(
            commit_id = %commit_id,
            committed,
            skipped,
            offsets = %offsets_json,
            "commit cycle closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelFactory;
    use crate::testing::InMemoryChannel;
    use std::time::Duration;
    use tidemark_table::MemoryCatalog;

    async fn coordinator(channel: &InMemoryChannel) -> Coordinator {
        let config = CoordinatorConfig {
            group: "cg".into(),
            source_topics: vec!["events".into()],
            commit_interval: Duration::ZERO,
            commit_timeout: Duration::from_secs(3600),
            ..CoordinatorConfig::default()
        };
        let ownership = PartitionOwnership::new("events", 0);
        ownership.replace([("events".to_string(), 0)]);
        Coordinator::new(
            config,
            Arc::new(MemoryCatalog::new()),
            ownership,
            channel.sender().await.unwrap(),
            channel.receiver().await.unwrap(),
        )
    }

    #[tokio::test]
    async fn process_before_start_is_an_error() {
        let channel = InMemoryChannel::new();
        let mut coordinator = coordinator(&channel).await;
        assert!(matches!(
            coordinator.process().await,
            Err(CoordinatorError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn non_leader_never_opens_a_cycle() {
        let channel = InMemoryChannel::new();
        let mut coordinator = coordinator(&channel).await;
        coordinator.ownership.replace([("events".to_string(), 1)]);
        coordinator.start();

        coordinator.process().await.unwrap();
        assert!(!coordinator.cycle_open());
        assert!(channel.history().is_empty());
    }

    #[tokio::test]
    async fn start_commit_publish_failure_leaves_idle() {
        let channel = InMemoryChannel::new();
        let mut coordinator = coordinator(&channel).await;
        coordinator.start();
        channel.fail_next_send();

        assert!(coordinator.process().await.is_err());
        assert!(!coordinator.cycle_open());
        assert!(channel.history().is_empty());

        // The next tick starts a fresh cycle.
        coordinator.process().await.unwrap();
        assert!(coordinator.cycle_open());
        assert_eq!(channel.history().len(), 1);
    }

    #[tokio::test]
    async fn stop_discards_open_cycle() {
        let channel = InMemoryChannel::new();
        let mut coordinator = coordinator(&channel).await;
        coordinator.start();
        coordinator.process().await.unwrap();
        assert!(coordinator.cycle_open());

        coordinator.stop();
        assert!(!coordinator.cycle_open());
        assert!(matches!(
            coordinator.process().await,
            Err(CoordinatorError::NotRunning)
        ));
    }
}
