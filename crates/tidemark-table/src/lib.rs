//! # Tidemark Table
//!
//! The versioned-table surface the commit coordinator writes to: a
//! [`Catalog`] resolves [`TableReference`]s to [`Table`] handles, and a
//! table accepts one atomic [`TableCommit`] at a time, producing a new
//! [`Snapshot`] in its history or failing without mutating anything.
//!
//! [`MemoryCatalog`] is a complete in-process implementation used by the
//! coordinator test suites and by embedded deployments.
//!
//! [`TableReference`]: tidemark_events::TableReference

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Catalog and table traits plus the snapshot model.
pub mod catalog;
/// In-memory catalog and table engine.
pub mod memory;

pub use catalog::{Catalog, Snapshot, SnapshotOperation, Table, TableCommit, TableError};
pub use memory::{MemoryCatalog, MemoryTable};
