//! Error types for the coordinator crate.

use thiserror::Error;

use crate::channel::ChannelError;
use tidemark_events::EventError;
use tidemark_table::TableError;

/// Errors surfaced by the coordinator to its driver.
///
/// Per-table commit failures are not in this enum: they are recovered at
/// the per-table granularity inside a cycle (logged, table skipped) and
/// never fatal to the process. A channel error aborts the current cycle
/// only; the next interval tick starts fresh.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Control channel publish, poll, or offset commit failed.
    #[error("control channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A control event could not be encoded.
    #[error("event codec error: {0}")]
    Codec(#[from] EventError),

    /// Catalog-level failure unrelated to a single table commit.
    #[error("table error: {0}")]
    Table(#[from] TableError),

    /// The coordinator has not been started or was stopped.
    #[error("coordinator is not running")]
    NotRunning,
}
