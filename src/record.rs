use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a user-owned record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId(id)
    }
}

/// Where a record stands in its derivation pipeline (e.g. audio rendering).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl ProcessingStatus {
    /// Stable label used as a grouping bucket.
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "Pending",
            ProcessingStatus::Processing => "Processing",
            ProcessingStatus::Ready => "Ready",
            ProcessingStatus::Failed => "Failed",
        }
    }
}

/// A user-authored record as this layer sees it: identity plus the small set
/// of fields the query surface filters and sorts on.
///
/// Records are owned exclusively by the store and mutated only through store
/// operations. Deletion is a flag transition; the flagged record survives in
/// the pending-sync ledger until the remote backend confirms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub status: ProcessingStatus,
    pub deleted: bool,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, title: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            title: title.into(),
            created_at: Utc::now(),
            status: ProcessingStatus::Pending,
            deleted: false,
        }
    }

    pub fn with_status(mut self, status: ProcessingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }
}
