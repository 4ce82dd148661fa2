use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{Record, RecordId};

/// What a queued operation will replay against the backend.
///
/// `Delete` carries the removed record: deletion is a flag transition, and
/// the flagged record lives here until the remote confirms (or a rejection
/// forces reinstatement). `Create`/`Rename` read the record's current state
/// from the store at flush time instead, so a later local edit wins over the
/// state at queue time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PendingKind {
    Create,
    Rename,
    Delete { record: Record },
}

impl PendingKind {
    pub fn name(&self) -> &'static str {
        match self {
            PendingKind::Create => "create",
            PendingKind::Rename => "rename",
            PendingKind::Delete { .. } => "delete",
        }
    }
}

/// Lifecycle of a queued operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingStatus {
    /// Waiting for the next flush.
    Pending,
    /// A flush is currently driving it against the backend.
    InFlight,
    /// The backend confirmed; the op is done and dropped from the ledger.
    Confirmed,
    /// Retries exhausted or the backend conclusively refused during flush.
    Abandoned,
}

/// A mutation that succeeded locally but still awaits remote confirmation.
/// One per record: a newer op on the same record supersedes the queued one,
/// since the store has already moved on and replaying a stale op would be
/// wrong.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingOp {
    pub record_id: RecordId,
    pub kind: PendingKind,
    pub status: PendingStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub queued_at: DateTime<Utc>,
}

impl PendingOp {
    pub fn new(record_id: RecordId, kind: PendingKind) -> Self {
        PendingOp {
            record_id,
            kind,
            status: PendingStatus::Pending,
            attempts: 0,
            last_error: None,
            queued_at: Utc::now(),
        }
    }

    pub fn begin_attempt(&mut self) {
        self.status = PendingStatus::InFlight;
        self.attempts += 1;
    }

    pub fn confirm(&mut self) {
        self.status = PendingStatus::Confirmed;
        self.last_error = None;
    }

    pub fn requeue(&mut self, error: impl Into<String>) {
        self.status = PendingStatus::Pending;
        self.last_error = Some(error.into());
    }

    pub fn abandon(&mut self, error: impl Into<String>) {
        self.status = PendingStatus::Abandoned;
        self.last_error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_lifecycle() {
        let mut op = PendingOp::new(RecordId::new("a"), PendingKind::Create);
        assert_eq!(op.status, PendingStatus::Pending);
        assert_eq!(op.attempts, 0);

        op.begin_attempt();
        assert_eq!(op.status, PendingStatus::InFlight);
        assert_eq!(op.attempts, 1);

        op.requeue("unreachable");
        assert_eq!(op.status, PendingStatus::Pending);
        assert_eq!(op.last_error.as_deref(), Some("unreachable"));

        op.begin_attempt();
        op.confirm();
        assert_eq!(op.status, PendingStatus::Confirmed);
        assert!(op.last_error.is_none());
    }

    #[test]
    fn delete_carries_the_flagged_record() {
        let mut record = Record::new("a", "title");
        record.deleted = true;
        let op = PendingOp::new(record.id.clone(), PendingKind::Delete { record });
        match &op.kind {
            PendingKind::Delete { record } => assert!(record.deleted),
            _ => panic!("expected delete"),
        }
        assert_eq!(op.kind.name(), "delete");
    }
}
