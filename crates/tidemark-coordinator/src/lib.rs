//! # Tidemark Coordinator
//!
//! Coordinates many independent writer tasks that append files to a
//! shared dataset, fusing their uncommitted output into one atomic,
//! versioned table commit per cycle.
//!
//! A single elected leader (the process owning the designated source
//! partition) runs the [`Coordinator`]: it publishes a `StartCommit`
//! event on the control channel, folds writer replies into a per-cycle
//! [`CommitState`](commit_state::CommitState), and on completeness or
//! timeout applies one commit per destination table, tagged with the
//! commit id, per-partition high-water offsets, and a valid-through
//! timestamp.
//!
//! The hosting connector drives everything through the
//! [`CoordinatorRunner`]: feed it partition assignments as they change
//! and call `process()` in a loop.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Control channel adapter traits.
pub mod channel;
/// Per-cycle commit aggregation state.
pub mod commit_state;
/// Dataset committer: accumulated files to one atomic table mutation.
pub mod committer;
/// Coordinator configuration.
pub mod config;
/// The commit-cycle state machine.
pub mod coordinator;
/// Error types.
pub mod error;
/// Kafka control channel backend.
#[cfg(feature = "kafka")]
pub mod kafka;
/// Partition ownership tracking and leader derivation.
pub mod ownership;
/// Leadership-driven coordinator lifecycle.
pub mod runner;
/// In-memory channel for tests and embedded use.
pub mod testing;

pub use channel::{ChannelError, ChannelFactory, ControlReceiver, ControlRecord, ControlSender};
pub use committer::{COMMIT_ID_PROP, OFFSETS_PROP, VALID_THROUGH_TS_PROP};
pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use error::CoordinatorError;
pub use ownership::{AssignmentSnapshot, LeaderTransition, PartitionOwnership};
pub use runner::CoordinatorRunner;
