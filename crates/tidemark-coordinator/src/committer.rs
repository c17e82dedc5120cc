//! Dataset committer: accumulated files to one atomic table mutation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use tidemark_events::{CommitId, TableReference};
use tidemark_table::{Catalog, Snapshot, SnapshotOperation, TableCommit, TableError};

use crate::commit_state::TableFileSet;

/// Snapshot property holding the commit cycle's id.
///
/// A snapshot already carrying a given id means that cycle's mutation was
/// applied; a retry must not re-apply it. The three property keys are a
/// compatibility contract with downstream readers.
pub const COMMIT_ID_PROP: &str = "tidemark.commit-id";
/// Snapshot property holding the per-partition high-water offsets as JSON.
pub const OFFSETS_PROP: &str = "tidemark.offsets";
/// Snapshot property holding the cycle's valid-through timestamp (RFC 3339).
pub const VALID_THROUGH_TS_PROP: &str = "tidemark.valid-through-ts";

/// Translates a cycle's accumulated file set into one atomic table commit.
pub struct TableCommitter {
    catalog: Arc<dyn Catalog>,
}

impl TableCommitter {
    /// Creates a committer over the destination catalog.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Commits one table's accumulated files as a single snapshot.
    ///
    /// Operation type is chosen by content: any delete file present makes
    /// it a row-delta overwrite, otherwise an append. If the table's
    /// history already carries `commit_id`, the mutation was applied by a
    /// previous attempt and the existing snapshot is returned unchanged.
    ///
    /// # Errors
    ///
    /// Propagates [`TableError`] from the catalog or the table; a spec or
    /// schema mismatch fails without partially mutating the table.
    pub async fn commit_table(
        &self,
        commit_id: CommitId,
        table_ref: &TableReference,
        files: &TableFileSet,
        offsets_json: &str,
        valid_through: Option<DateTime<Utc>>,
    ) -> Result<Snapshot, TableError> {
        let table = self.catalog.load_table(table_ref).await?;

        let commit_id_str = commit_id.to_string();
        if let Some(existing) = table
            .snapshots()
            .await
            .into_iter()
            .find(|s| s.summary.get(COMMIT_ID_PROP) == Some(&commit_id_str))
        {
            info!(
                table = %table_ref,
                commit_id = %commit_id,
                snapshot_id = existing.snapshot_id,
                "commit already applied, skipping"
            );
            return Ok(existing);
        }

        let operation = if files.delete_files.is_empty() {
            SnapshotOperation::Append
        } else {
            SnapshotOperation::Overwrite
        };

        let mut summary = BTreeMap::new();
        summary.insert(COMMIT_ID_PROP.to_string(), commit_id_str);
        summary.insert(OFFSETS_PROP.to_string(), offsets_json.to_string());
        if let Some(ts) = valid_through {
            summary.insert(
                VALID_THROUGH_TS_PROP.to_string(),
                ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            );
        }

        debug!(
            table = %table_ref,
            commit_id = %commit_id,
            operation = ?operation,
            data_files = files.data_files.len(),
            delete_files = files.delete_files.len(),
            "committing table"
        );

        table
            .commit(TableCommit {
                operation,
                data_files: files.data_files.clone(),
                delete_files: files.delete_files.clone(),
                summary,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tidemark_events::{DataFile, DeleteFile, DeleteKind, FileFormat};
    use tidemark_table::MemoryCatalog;

    fn table_ref() -> TableReference {
        TableReference::new("main", vec!["db".into()], "tbl")
    }

    fn data_file() -> DataFile {
        DataFile {
            path: "a.parquet".into(),
            format: FileFormat::Parquet,
            partition_spec_id: 0,
            schema_id: 0,
            record_count: 5,
            file_size_bytes: 100,
        }
    }

    fn delete_file() -> DeleteFile {
        DeleteFile {
            path: "d.parquet".into(),
            format: FileFormat::Parquet,
            kind: DeleteKind::Position,
            partition_spec_id: 0,
            schema_id: 0,
            record_count: 1,
            file_size_bytes: 40,
        }
    }

    fn committer_with_table() -> (TableCommitter, Arc<MemoryCatalog>) {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.create_table(table_ref(), &[0], &[0]);
        (TableCommitter::new(Arc::clone(&catalog) as _), catalog)
    }

    #[tokio::test]
    async fn append_when_no_delete_files() {
        let (committer, _) = committer_with_table();
        let files = TableFileSet {
            data_files: vec![data_file()],
            delete_files: vec![],
        };
        let snapshot = committer
            .commit_table(CommitId::random(), &table_ref(), &files, "{}", None)
            .await
            .unwrap();
        assert_eq!(snapshot.operation, SnapshotOperation::Append);
    }

    #[tokio::test]
    async fn overwrite_when_delete_files_present() {
        let (committer, _) = committer_with_table();
        let files = TableFileSet {
            data_files: vec![data_file()],
            delete_files: vec![delete_file()],
        };
        let snapshot = committer
            .commit_table(CommitId::random(), &table_ref(), &files, "{}", None)
            .await
            .unwrap();
        assert_eq!(snapshot.operation, SnapshotOperation::Overwrite);
    }

    #[tokio::test]
    async fn summary_carries_contract_properties() {
        let (committer, _) = committer_with_table();
        let id = CommitId::random();
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let files = TableFileSet {
            data_files: vec![data_file()],
            delete_files: vec![],
        };
        let snapshot = committer
            .commit_table(id, &table_ref(), &files, r#"{"0":3}"#, Some(ts))
            .await
            .unwrap();

        assert_eq!(snapshot.summary.get(COMMIT_ID_PROP), Some(&id.to_string()));
        assert_eq!(
            snapshot.summary.get(OFFSETS_PROP).map(String::as_str),
            Some(r#"{"0":3}"#)
        );
        assert_eq!(
            snapshot.summary.get(VALID_THROUGH_TS_PROP).map(String::as_str),
            Some("2026-03-01T12:00:00Z")
        );
    }

    #[tokio::test]
    async fn valid_through_property_omitted_when_unknown() {
        let (committer, _) = committer_with_table();
        let files = TableFileSet {
            data_files: vec![data_file()],
            delete_files: vec![],
        };
        let snapshot = committer
            .commit_table(CommitId::random(), &table_ref(), &files, "{}", None)
            .await
            .unwrap();
        assert!(!snapshot.summary.contains_key(VALID_THROUGH_TS_PROP));
    }

    #[tokio::test]
    async fn retry_with_same_commit_id_applies_once() {
        let (committer, catalog) = committer_with_table();
        let id = CommitId::random();
        let files = TableFileSet {
            data_files: vec![data_file()],
            delete_files: vec![],
        };

        let first = committer
            .commit_table(id, &table_ref(), &files, "{}", None)
            .await
            .unwrap();
        let second = committer
            .commit_table(id, &table_ref(), &files, "{}", None)
            .await
            .unwrap();

        assert_eq!(first.snapshot_id, second.snapshot_id);
        let table = catalog.load_table(&table_ref()).await.unwrap();
        assert_eq!(table.snapshots().await.len(), 1);
    }

    #[tokio::test]
    async fn incompatible_spec_propagates() {
        let (committer, catalog) = committer_with_table();
        let mut bad = data_file();
        bad.partition_spec_id = 1;
        let files = TableFileSet {
            data_files: vec![bad],
            delete_files: vec![],
        };

        let err = committer
            .commit_table(CommitId::random(), &table_ref(), &files, "{}", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::IncompatibleSpec { .. }));

        let table = catalog.load_table(&table_ref()).await.unwrap();
        assert!(table.snapshots().await.is_empty());
    }
}
