//! Shared protocol types.
//!
//! These types appear inside control events and in the table commit
//! surface, so they live in one leaf crate both sides can depend on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique identifier for one commit cycle.
///
/// Minted by the coordinator when it opens a cycle, carried by every
/// control event in that cycle, and stamped on the resulting table
/// snapshot as an idempotency token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(Uuid);

impl CommitId {
    /// Mints a fresh random commit id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Fully qualified reference to a destination table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableReference {
    /// Catalog name.
    pub catalog: String,
    /// Namespace path within the catalog.
    pub namespace: Vec<String>,
    /// Table name.
    pub name: String,
}

impl TableReference {
    /// Creates a table reference from a catalog, namespace path, and name.
    pub fn new(
        catalog: impl Into<String>,
        namespace: Vec<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            namespace,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TableReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.catalog)?;
        for part in &self.namespace {
            write!(f, ".{part}")?;
        }
        write!(f, ".{}", self.name)
    }
}

/// On-disk format of a written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Apache Parquet.
    Parquet,
    /// Apache Avro.
    Avro,
    /// Apache ORC.
    Orc,
}

/// Descriptor for one data file produced by a writer task.
///
/// Carries only the metadata the commit protocol needs; file contents
/// never travel over the control channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    /// Storage path of the file.
    pub path: String,
    /// File format.
    pub format: FileFormat,
    /// Partition spec the file was written under.
    pub partition_spec_id: i32,
    /// Schema the file was written under.
    pub schema_id: i32,
    /// Number of records in the file.
    pub record_count: u64,
    /// File size in bytes.
    pub file_size_bytes: u64,
}

/// Kind of delete content in a delete file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteKind {
    /// Position deletes (file path + row position).
    Position,
    /// Equality deletes (column value match).
    Equality,
}

/// Descriptor for one delete file produced by a writer task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFile {
    /// Storage path of the file.
    pub path: String,
    /// File format.
    pub format: FileFormat,
    /// Kind of deletes the file carries.
    pub kind: DeleteKind,
    /// Partition spec the file was written under.
    pub partition_spec_id: i32,
    /// Schema the file was written under.
    pub schema_id: i32,
    /// Number of delete records in the file.
    pub record_count: u64,
    /// File size in bytes.
    pub file_size_bytes: u64,
}

/// One writer's high-water report for one source partition.
///
/// `offset` is the highest offset the writer consumed from that partition
/// during the cycle, or `None` if it consumed nothing new. `valid_through`
/// is the event-time watermark the writer can vouch for; `None` means the
/// writer cannot bound it, which prevents the cycle from claiming any
/// validity timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionWatermark {
    /// Source topic name.
    pub topic: String,
    /// Source partition number.
    pub partition: i32,
    /// Highest consumed offset, if any.
    pub offset: Option<i64>,
    /// Event-time watermark for this partition, if known.
    pub valid_through: Option<DateTime<Utc>>,
}

impl PartitionWatermark {
    /// Creates a watermark report for one source partition.
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: Option<i64>,
        valid_through: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            valid_through,
        }
    }
}
