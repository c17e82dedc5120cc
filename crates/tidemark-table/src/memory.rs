//! In-memory catalog and table engine.
//!
//! Complete implementation of the [`Catalog`]/[`Table`] traits backed by
//! process memory. Snapshot history lives under a mutex; validation runs
//! before any mutation so a failed commit leaves the history untouched.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use tidemark_events::TableReference;

use crate::catalog::{Catalog, Snapshot, Table, TableCommit, TableError};

/// In-memory versioned table.
pub struct MemoryTable {
    reference: TableReference,
    /// Partition spec ids registered with the table.
    spec_ids: BTreeSet<i32>,
    /// Schema ids registered with the table.
    schema_ids: BTreeSet<i32>,
    history: Mutex<Vec<Snapshot>>,
}

impl MemoryTable {
    /// Creates a table accepting the given partition spec and schema ids.
    #[must_use]
    pub fn new(reference: TableReference, spec_ids: &[i32], schema_ids: &[i32]) -> Self {
        Self {
            reference,
            spec_ids: spec_ids.iter().copied().collect(),
            schema_ids: schema_ids.iter().copied().collect(),
            history: Mutex::new(Vec::new()),
        }
    }

    fn validate(&self, commit: &TableCommit) -> Result<(), TableError> {
        let spec_schema_pairs = commit
            .data_files
            .iter()
            .map(|f| (f.partition_spec_id, f.schema_id))
            .chain(
                commit
                    .delete_files
                    .iter()
                    .map(|f| (f.partition_spec_id, f.schema_id)),
            );
        for (spec_id, schema_id) in spec_schema_pairs {
            if !self.spec_ids.contains(&spec_id) {
                return Err(TableError::IncompatibleSpec {
                    table: self.reference.clone(),
                    spec_id,
                });
            }
            if !self.schema_ids.contains(&schema_id) {
                return Err(TableError::IncompatibleSchema {
                    table: self.reference.clone(),
                    schema_id,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Table for MemoryTable {
    fn reference(&self) -> &TableReference {
        &self.reference
    }

    async fn commit(&self, commit: TableCommit) -> Result<Snapshot, TableError> {
        self.validate(&commit)?;

        let mut history = self.history.lock();
        let snapshot = Snapshot {
            snapshot_id: history.len() as i64 + 1,
            operation: commit.operation,
            data_files: commit.data_files,
            delete_files: commit.delete_files,
            summary: commit.summary,
        };
        history.push(snapshot.clone());
        debug!(
            table = %self.reference,
            snapshot_id = snapshot.snapshot_id,
            data_files = snapshot.data_files.len(),
            delete_files = snapshot.delete_files.len(),
            "committed snapshot"
        );
        Ok(snapshot)
    }

    async fn snapshots(&self) -> Vec<Snapshot> {
        self.history.lock().clone()
    }
}

/// In-memory catalog of [`MemoryTable`]s.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: RwLock<HashMap<TableReference, Arc<MemoryTable>>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table accepting the given partition spec and schema ids.
    ///
    /// Replaces any existing table under the same reference.
    pub fn create_table(
        &self,
        reference: TableReference,
        spec_ids: &[i32],
        schema_ids: &[i32],
    ) -> Arc<MemoryTable> {
        let table = Arc::new(MemoryTable::new(reference.clone(), spec_ids, schema_ids));
        self.tables.write().insert(reference, Arc::clone(&table));
        table
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn load_table(&self, reference: &TableReference) -> Result<Arc<dyn Table>, TableError> {
        self.tables
            .read()
            .get(reference)
            .cloned()
            .map(|t| t as Arc<dyn Table>)
            .ok_or_else(|| TableError::TableNotFound(reference.clone()))
    }
}
