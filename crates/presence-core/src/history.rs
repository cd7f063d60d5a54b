//! Bounded, most-recent-first log of snapshot records.
//!
//! Every successful point query produces one [`SnapshotRecord`]; the log
//! keeps the most recent records up to a cap so that a long-running
//! monitoring session cannot grow without bound. Records are never
//! mutated once appended; the only operations are append, export, and
//! clear.

use std::collections::VecDeque;

use presence_types::SnapshotRecord;

/// Default number of records retained before the oldest are evicted.
const DEFAULT_CAP: usize = 200;

/// Errors that can occur when exporting the history log.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A record could not be serialized for export.
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Most-recent-first log of snapshot records with a retention cap.
#[derive(Debug)]
pub struct HistoryLog {
    records: VecDeque<SnapshotRecord>,
    cap: usize,
}

impl HistoryLog {
    /// Create a log with the default retention cap.
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_CAP)
    }

    /// Create a log retaining at most `cap` records.
    ///
    /// A cap of zero keeps nothing; every append is immediately evicted.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(cap.min(DEFAULT_CAP)),
            cap,
        }
    }

    /// Insert a record at the front (most recent first), evicting from the
    /// back once the cap is exceeded. Amortized O(1).
    pub fn append(&mut self, record: SnapshotRecord) {
        self.records.push_front(record);
        while self.records.len() > self.cap {
            self.records.pop_back();
        }
    }

    /// Serialize the full log, most recent first, as pretty JSON for
    /// operator export.
    pub fn export_all(&self) -> Result<String, HistoryError> {
        let ordered: Vec<&SnapshotRecord> = self.records.iter().collect();
        Ok(serde_json::to_string_pretty(&ordered)?)
    }

    /// Drop every record. Idempotent.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Iterate records, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &SnapshotRecord> {
        self.records.iter()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}
