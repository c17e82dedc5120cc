//! Event envelope and payload variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommitId, DataFile, DeleteFile, PartitionWatermark, TableReference};

/// An immutable control-channel event.
///
/// `group` identifies the coordination group the event belongs to;
/// consumers drop events stamped with a foreign group so unrelated
/// deployments can share a control topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Coordination-group identifier.
    pub group: String,
    /// The typed payload.
    pub payload: Payload,
}

impl Event {
    /// Creates an event for the given group.
    pub fn new(group: impl Into<String>, payload: Payload) -> Self {
        Self {
            group: group.into(),
            payload,
        }
    }
}

/// Control event payload.
///
/// Unknown type tags decode to [`Payload::Unknown`] rather than failing,
/// so older readers tolerate newer protocol versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Payload {
    /// Coordinator broadcast opening a commit cycle.
    StartCommit {
        /// Id of the cycle being opened.
        commit_id: CommitId,
    },
    /// Writer reply carrying the files it wrote for one table.
    ///
    /// A writer may send zero or more of these per cycle; empty file
    /// lists are a legal no-op.
    DataWritten {
        /// Cycle the reply answers.
        commit_id: CommitId,
        /// Destination table the files belong to.
        table: TableReference,
        /// Data files written during the cycle.
        data_files: Vec<DataFile>,
        /// Delete files written during the cycle.
        delete_files: Vec<DeleteFile>,
    },
    /// Writer reply signalling it has no more data for the cycle.
    DataComplete {
        /// Cycle the reply answers.
        commit_id: CommitId,
        /// High-water report per source partition the writer owns.
        watermarks: Vec<PartitionWatermark>,
    },
    /// Coordinator notification that one table received its mutation.
    CommitToTable {
        /// Cycle the commit belongs to.
        commit_id: CommitId,
        /// Table that was committed.
        table: TableReference,
        /// Valid-through timestamp stamped on the snapshot, if known.
        valid_through: Option<DateTime<Utc>>,
    },
    /// Coordinator broadcast closing a commit cycle.
    ///
    /// Always published at cycle close, even when nothing was committed,
    /// so writers can advance their externally tracked offsets.
    CommitComplete {
        /// Cycle being closed.
        commit_id: CommitId,
        /// Valid-through timestamp of the cycle, if known.
        valid_through: Option<DateTime<Utc>>,
    },
    /// Unrecognized payload type from a newer protocol version.
    #[serde(other)]
    Unknown,
}

impl Payload {
    /// Returns the commit cycle this payload belongs to.
    ///
    /// `None` only for [`Payload::Unknown`].
    #[must_use]
    pub fn commit_id(&self) -> Option<CommitId> {
        match self {
            Self::StartCommit { commit_id }
            | Self::DataWritten { commit_id, .. }
            | Self::DataComplete { commit_id, .. }
            | Self::CommitToTable { commit_id, .. }
            | Self::CommitComplete { commit_id, .. } => Some(*commit_id),
            Self::Unknown => None,
        }
    }

    /// Returns the payload's type discriminant.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Self::StartCommit { .. } => PayloadType::StartCommit,
            Self::DataWritten { .. } => PayloadType::DataWritten,
            Self::DataComplete { .. } => PayloadType::DataComplete,
            Self::CommitToTable { .. } => PayloadType::CommitToTable,
            Self::CommitComplete { .. } => PayloadType::CommitComplete,
            Self::Unknown => PayloadType::Unknown,
        }
    }
}

/// Discriminant of a [`Payload`], for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    /// [`Payload::StartCommit`].
    StartCommit,
    /// [`Payload::DataWritten`].
    DataWritten,
    /// [`Payload::DataComplete`].
    DataComplete,
    /// [`Payload::CommitToTable`].
    CommitToTable,
    /// [`Payload::CommitComplete`].
    CommitComplete,
    /// [`Payload::Unknown`].
    Unknown,
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StartCommit => "START_COMMIT",
            Self::DataWritten => "DATA_WRITTEN",
            Self::DataComplete => "DATA_COMPLETE",
            Self::CommitToTable => "COMMIT_TO_TABLE",
            Self::CommitComplete => "COMMIT_COMPLETE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_id_accessor_covers_all_variants() {
        let id = CommitId::random();
        let table = TableReference::new("main", vec!["db".into()], "tbl");

        let payloads = [
            Payload::StartCommit { commit_id: id },
            Payload::DataWritten {
                commit_id: id,
                table: table.clone(),
                data_files: vec![],
                delete_files: vec![],
            },
            Payload::DataComplete {
                commit_id: id,
                watermarks: vec![],
            },
            Payload::CommitToTable {
                commit_id: id,
                table,
                valid_through: None,
            },
            Payload::CommitComplete {
                commit_id: id,
                valid_through: None,
            },
        ];
        for p in payloads {
            assert_eq!(p.commit_id(), Some(id));
        }
        assert_eq!(Payload::Unknown.commit_id(), None);
    }

    #[test]
    fn payload_type_display_matches_wire_tags() {
        assert_eq!(PayloadType::StartCommit.to_string(), "START_COMMIT");
        assert_eq!(PayloadType::CommitComplete.to_string(), "COMMIT_COMPLETE");
    }
}
