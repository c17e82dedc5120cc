//! Catalog and table traits plus the snapshot model.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tidemark_events::{DataFile, DeleteFile, TableReference};

/// Errors from catalog and table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// The referenced table does not exist in the catalog.
    #[error("table '{0}' not found")]
    TableNotFound(TableReference),

    /// A file references a partition spec the table does not carry.
    #[error("table '{table}' has no partition spec {spec_id}")]
    IncompatibleSpec {
        /// The target table.
        table: TableReference,
        /// The offending spec id.
        spec_id: i32,
    },

    /// A file references a schema the table does not carry.
    #[error("table '{table}' has no schema {schema_id}")]
    IncompatibleSchema {
        /// The target table.
        table: TableReference,
        /// The offending schema id.
        schema_id: i32,
    },

    /// The commit lost a race against a concurrent mutation.
    #[error("commit conflict: {0}")]
    CommitConflict(String),
}

/// Operation type of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOperation {
    /// Data files only were added.
    Append,
    /// The mutation carried row-level deletes.
    Overwrite,
}

/// One committed version of a table.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Monotonically increasing snapshot id, unique within the table.
    pub snapshot_id: i64,
    /// Operation that produced the snapshot.
    pub operation: SnapshotOperation,
    /// Data files added by the snapshot.
    pub data_files: Vec<DataFile>,
    /// Delete files added by the snapshot.
    pub delete_files: Vec<DeleteFile>,
    /// String properties attached at commit time.
    pub summary: BTreeMap<String, String>,
}

/// One atomic mutation request against a table.
#[derive(Debug, Clone)]
pub struct TableCommit {
    /// Operation to record.
    pub operation: SnapshotOperation,
    /// Data files to add.
    pub data_files: Vec<DataFile>,
    /// Delete files to add.
    pub delete_files: Vec<DeleteFile>,
    /// Properties to attach to the resulting snapshot.
    pub summary: BTreeMap<String, String>,
}

/// A versioned table that accepts atomic commits.
#[async_trait]
pub trait Table: Send + Sync {
    /// Returns the table's reference.
    fn reference(&self) -> &TableReference;

    /// Applies one atomic mutation.
    ///
    /// Every file's partition spec id and schema id must be registered
    /// with the table; any mismatch fails the whole commit and the table
    /// history is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::IncompatibleSpec`] or
    /// [`TableError::IncompatibleSchema`] on validation failure, or
    /// [`TableError::CommitConflict`] if a concurrent mutation won.
    async fn commit(&self, commit: TableCommit) -> Result<Snapshot, TableError>;

    /// Returns the table's snapshot history, oldest first.
    async fn snapshots(&self) -> Vec<Snapshot>;
}

/// Resolves table references to table handles.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Loads a table by reference.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::TableNotFound`] if the reference does not
    /// resolve.
    async fn load_table(&self, reference: &TableReference) -> Result<Arc<dyn Table>, TableError>;
}
