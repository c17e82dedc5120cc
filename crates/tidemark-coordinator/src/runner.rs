//! Leadership-driven coordinator lifecycle.
//!
//! The hosting connector feeds partition assignments into the runner as
//! rebalances land and calls [`CoordinatorRunner::process`] from its
//! drive loop. The runner starts a fresh [`Coordinator`] when this
//! process acquires the designated partition and stops it when the
//! partition is lost. Stop completes before `on_assignment` returns, so
//! a successor cannot observe two live leaders.

use std::sync::Arc;

use tracing::info;

use tidemark_table::Catalog;

use crate::channel::ChannelFactory;
use crate::config::CoordinatorConfig;
use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;
use crate::ownership::{LeaderTransition, PartitionOwnership};

/// Starts and stops the [`Coordinator`] as leadership changes hands.
pub struct CoordinatorRunner {
    config: CoordinatorConfig,
    catalog: Arc<dyn Catalog>,
    channels: Arc<dyn ChannelFactory>,
    ownership: PartitionOwnership,
    coordinator: Option<Coordinator>,
}

impl CoordinatorRunner {
    /// Creates a runner for the given configuration.
    ///
    /// The designated leader partition is partition 0 of the first
    /// configured source topic; with no source topics configured the
    /// runner never starts a coordinator.
    #[must_use]
    pub fn new(
        config: CoordinatorConfig,
        catalog: Arc<dyn Catalog>,
        channels: Arc<dyn ChannelFactory>,
    ) -> Self {
        let (topic, partition) = config
            .leader_partition()
            .unwrap_or_else(|| (String::new(), -1));
        let ownership = PartitionOwnership::new(topic, partition);
        Self {
            config,
            catalog,
            channels,
            ownership,
            coordinator: None,
        }
    }

    /// Shared handle to the ownership tracker, for wiring rebalance
    /// callbacks.
    #[must_use]
    pub fn ownership(&self) -> PartitionOwnership {
        self.ownership.clone()
    }

    /// Returns `true` while a coordinator is running on this process.
    #[must_use]
    pub fn is_coordinator_running(&self) -> bool {
        self.coordinator.is_some()
    }

    /// Applies a new partition assignment and acts on the leadership
    /// transition it causes.
    ///
    /// Becoming leader builds fresh channel clients and starts a new
    /// coordinator; resigning stops the running one, discarding any
    /// in-flight cycle without committing.
    ///
    /// # Errors
    ///
    /// Returns a [`CoordinatorError`] if channel clients cannot be
    /// built when acquiring leadership.
    pub async fn on_assignment(
        &mut self,
        partitions: impl IntoIterator<Item = (String, i32)>,
    ) -> Result<(), CoordinatorError> {
        match self.ownership.replace(partitions) {
            LeaderTransition::BecomeLeader => self.start_coordinator().await,
            LeaderTransition::ResignLeader => {
                self.stop_coordinator();
                Ok(())
            }
            LeaderTransition::NoOp => Ok(()),
        }
    }

    /// Runs one coordinator iteration, if a coordinator is running.
    ///
    /// # Errors
    ///
    /// Propagates [`CoordinatorError`] from the running coordinator.
    pub async fn process(&mut self) -> Result<(), CoordinatorError> {
        if let Some(coordinator) = self.coordinator.as_mut() {
            coordinator.process().await?;
        }
        Ok(())
    }

    /// Stops any running coordinator, for task shutdown.
    pub fn shutdown(&mut self) {
        self.stop_coordinator();
    }

    async fn start_coordinator(&mut self) -> Result<(), CoordinatorError> {
        // At most one live coordinator per process.
        self.stop_coordinator();

        let sender = self.channels.sender().await?;
        let receiver = self.channels.receiver().await?;
        let mut coordinator = Coordinator::new(
            self.config.clone(),
            Arc::clone(&self.catalog),
            self.ownership.clone(),
            sender,
            receiver,
        );
        coordinator.start();
        self.coordinator = Some(coordinator);
        info!(group = %self.config.group, "coordinator started on leadership acquisition");
        Ok(())
    }

    fn stop_coordinator(&mut self) {
        if let Some(mut coordinator) = self.coordinator.take() {
            coordinator.stop();
            info!(group = %self.config.group, "coordinator stopped on leadership loss");
        }
    }
}
