use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::RecordId;

/// Which side of the network boundary a sync error belongs to.
///
/// `Local` errors never left the device and are safe to surface destructively
/// to the user. `Remote` errors mean the change is persisted locally but not
/// confirmed remotely; they must never be presented as data loss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorScope {
    Local,
    Remote,
}

/// Why a sync operation did not fully succeed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SyncError {
    #[error("record {0} does not exist")]
    RecordMissing(RecordId),
    #[error("record {0} is already deleted")]
    AlreadyDeleted(RecordId),
    #[error("remote rejected the change to {id}: {reason}")]
    RemoteRejected { id: RecordId, reason: String },
    #[error("remote backend unreachable for {0}, change queued for retry")]
    RemoteUnreachable(RecordId),
}

impl SyncError {
    pub fn scope(&self) -> ErrorScope {
        match self {
            SyncError::RecordMissing(_) | SyncError::AlreadyDeleted(_) => ErrorScope::Local,
            SyncError::RemoteRejected { .. } | SyncError::RemoteUnreachable(_) => ErrorScope::Remote,
        }
    }
}

/// How far a successful mutation got.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Confirmed by the remote backend.
    Synced,
    /// Durable on-device and accepted as done; remote confirmation pending.
    /// Terminal from the local store's point of view - never rolled back.
    QueuedLocal,
}

/// Effect of a mutating operation, created fresh per call and consumed once
/// by the caller to decide rollback, retry, and what to show the user.
///
/// Batch operations report through `Partial` even when every item confirmed,
/// so the per-item shape is uniform; `is_success` treats an empty failure
/// list as success.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome<T> {
    Success {
        value: T,
        state: SyncState,
    },
    Failure {
        error: SyncError,
    },
    Partial {
        succeeded: Vec<T>,
        failed: Vec<(T, SyncError)>,
    },
}

impl<T> SyncOutcome<T> {
    pub fn is_success(&self) -> bool {
        match self {
            SyncOutcome::Success { .. } => true,
            SyncOutcome::Failure { .. } => false,
            SyncOutcome::Partial { failed, .. } => failed.is_empty(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failure { .. })
    }

    pub fn state(&self) -> Option<SyncState> {
        match self {
            SyncOutcome::Success { state, .. } => Some(*state),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncOutcome::Failure { error } => Some(error),
            _ => None,
        }
    }

    /// Presentation-ready one-liner ("3 synced, 2 will retry"). The mapping
    /// from outcome to toast/alert/haptic is the presentation layer's job;
    /// this is the neutral text it can fall back on.
    pub fn summary(&self) -> String {
        match self {
            SyncOutcome::Success {
                state: SyncState::Synced,
                ..
            } => "synced".to_string(),
            SyncOutcome::Success {
                state: SyncState::QueuedLocal,
                ..
            } => "saved, will sync when online".to_string(),
            SyncOutcome::Failure { error } => error.to_string(),
            SyncOutcome::Partial { succeeded, failed } => {
                if failed.is_empty() {
                    format!("{} synced", succeeded.len())
                } else {
                    format!("{} synced, {} will retry", succeeded.len(), failed.len())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RecordId {
        RecordId::new(s)
    }

    #[test]
    fn scopes() {
        assert_eq!(SyncError::RecordMissing(id("a")).scope(), ErrorScope::Local);
        assert_eq!(SyncError::AlreadyDeleted(id("a")).scope(), ErrorScope::Local);
        assert_eq!(
            SyncError::RemoteRejected {
                id: id("a"),
                reason: "validation".into()
            }
            .scope(),
            ErrorScope::Remote
        );
        assert_eq!(
            SyncError::RemoteUnreachable(id("a")).scope(),
            ErrorScope::Remote
        );
    }

    #[test]
    fn partial_with_no_failures_counts_as_success() {
        let outcome: SyncOutcome<RecordId> = SyncOutcome::Partial {
            succeeded: vec![id("a"), id("b")],
            failed: Vec::new(),
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.summary(), "2 synced");
    }

    #[test]
    fn partial_summary_counts_retries() {
        let outcome: SyncOutcome<RecordId> = SyncOutcome::Partial {
            succeeded: vec![id("a"), id("b"), id("c")],
            failed: vec![
                (id("d"), SyncError::RemoteUnreachable(id("d"))),
                (
                    id("e"),
                    SyncError::RemoteRejected {
                        id: id("e"),
                        reason: "gone".into(),
                    },
                ),
            ],
        };
        assert!(!outcome.is_success());
        assert!(!outcome.is_failure());
        assert_eq!(outcome.summary(), "3 synced, 2 will retry");
    }

    #[test]
    fn queued_local_summary_is_informational() {
        let outcome = SyncOutcome::Success {
            value: id("a"),
            state: SyncState::QueuedLocal,
        };
        assert_eq!(outcome.state(), Some(SyncState::QueuedLocal));
        assert_eq!(outcome.summary(), "saved, will sync when online");
    }
}
