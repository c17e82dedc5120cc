//! Per-cycle commit aggregation state.
//!
//! One [`CommitState`] exists per open commit cycle, owned exclusively by
//! the coordinator's processing loop. It is constructed fresh when a
//! cycle opens and discarded when the cycle closes or is abandoned; no
//! state survives across cycles.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use tidemark_events::{CommitId, DataFile, DeleteFile, PartitionWatermark, TableReference};

/// Files accumulated for one destination table during a cycle.
#[derive(Debug, Clone, Default)]
pub struct TableFileSet {
    /// Data files, in arrival order.
    pub data_files: Vec<DataFile>,
    /// Delete files, in arrival order.
    pub delete_files: Vec<DeleteFile>,
}

impl TableFileSet {
    /// Returns `true` when the set holds no files at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_files.is_empty() && self.delete_files.is_empty()
    }
}

/// Aggregation state for one open commit cycle.
#[derive(Debug)]
pub struct CommitState {
    commit_id: CommitId,
    started_at: Instant,
    /// Source partitions still expected to report completion.
    expected: BTreeSet<(String, i32)>,
    files_by_table: BTreeMap<TableReference, TableFileSet>,
    /// Highest reported offset per source partition. Max-merge only;
    /// a lower re-report never regresses a stored value.
    offsets: BTreeMap<(String, i32), i64>,
    /// Every completion report seen this cycle; valid-through is derived
    /// from these at closure.
    watermarks: Vec<PartitionWatermark>,
}

impl CommitState {
    /// Opens a cycle expecting completion reports for the given source
    /// partitions.
    #[must_use]
    pub fn new(commit_id: CommitId, expected: BTreeSet<(String, i32)>) -> Self {
        Self {
            commit_id,
            started_at: Instant::now(),
            expected,
            files_by_table: BTreeMap::new(),
            offsets: BTreeMap::new(),
            watermarks: Vec::new(),
        }
    }

    /// The cycle's commit id. Set once, immutable for the cycle.
    #[must_use]
    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    /// Folds one writer's `DataWritten` reply into the cycle.
    ///
    /// Duplicate replies for the same table append; empty file lists are
    /// a legal no-op that still registers the table.
    pub fn data_written(
        &mut self,
        table: TableReference,
        data_files: Vec<DataFile>,
        delete_files: Vec<DeleteFile>,
    ) {
        let set = self.files_by_table.entry(table).or_default();
        set.data_files.extend(data_files);
        set.delete_files.extend(delete_files);
    }

    /// Folds one writer's `DataComplete` reply into the cycle.
    pub fn data_complete(&mut self, watermarks: Vec<PartitionWatermark>) {
        for wm in watermarks {
            let key = (wm.topic.clone(), wm.partition);
            if let Some(offset) = wm.offset {
                let entry = self.offsets.entry(key.clone()).or_insert(offset);
                *entry = (*entry).max(offset);
            }
            if self.expected.remove(&key) {
                debug!(
                    topic = %key.0,
                    partition = key.1,
                    remaining = self.expected.len(),
                    "source partition reported complete"
                );
            }
            self.watermarks.push(wm);
        }
    }

    /// Returns `true` when every expected source partition has reported.
    #[must_use]
    pub fn complete(&self) -> bool {
        self.expected.is_empty()
    }

    /// Returns `true` when the cycle has been open longer than
    /// `commit_timeout`.
    #[must_use]
    pub fn timed_out(&self, commit_timeout: Duration) -> bool {
        self.started_at.elapsed() >= commit_timeout
    }

    /// Source partitions that never reported, for timeout diagnostics.
    #[must_use]
    pub fn missing_partitions(&self) -> &BTreeSet<(String, i32)> {
        &self.expected
    }

    /// The earliest valid-through timestamp across all completion
    /// reports.
    ///
    /// The commit cannot claim validity beyond the least-advanced
    /// partition, so a report without a timestamp makes this `None`.
    #[must_use]
    pub fn valid_through(&self) -> Option<DateTime<Utc>> {
        let mut min: Option<DateTime<Utc>> = None;
        for wm in &self.watermarks {
            let ts = wm.valid_through?;
            min = Some(min.map_or(ts, |m| m.min(ts)));
        }
        min
    }

    /// Accumulated files per destination table, in table order.
    pub fn tables(&self) -> impl Iterator<Item = (&TableReference, &TableFileSet)> {
        self.files_by_table.iter()
    }

    /// Serializes the high-water offsets as a JSON object mapping
    /// partition number to offset, ascending by partition.
    ///
    /// This string is a compatibility contract with downstream readers
    /// of the snapshot property.
    #[must_use]
    pub fn offsets_json(&self) -> String {
        let mut by_partition: BTreeMap<i32, i64> = BTreeMap::new();
        for (&(_, partition), &offset) in &self.offsets {
            let entry = by_partition.entry(partition).or_insert(offset);
            *entry = (*entry).max(offset);
        }
        serde_json::to_string(&by_partition).unwrap_or_else(|_| "{}".to_string())
    }
}
