use std::collections::BTreeMap;

use log::{debug, warn};

use crate::record::{Record, RecordId};
use crate::store::RevisionedStore;
use crate::sync::backend::{RemoteBackend, RemoteError};
use crate::sync::outcome::{SyncError, SyncOutcome, SyncState};
use crate::sync::pending::{PendingKind, PendingOp, PendingStatus};

/// Result of one flush pass over the pending-op ledger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Ops actually driven against the backend.
    pub attempted: usize,
    /// Ops the backend confirmed; dropped from the ledger.
    pub confirmed: usize,
    /// Ops put back for a later flush (backend unreachable, retries left).
    pub requeued: usize,
    /// Ops that stopped retrying (retries exhausted or conclusive refusal).
    pub abandoned: usize,
    /// Ops dropped because a later local mutation made them moot.
    pub superseded: usize,
}

/// Orchestrates optimistic local mutation against eventual remote
/// persistence.
///
/// Every mutating use case follows the same shape: apply to the store first
/// (the UI reflects it before any network round-trip), then invoke the
/// backend, then map the result to a [`SyncOutcome`]. A backend that cannot
/// be reached turns the op into a ledger entry that [`flush`](Self::flush)
/// reconciles out of band; only a conclusive remote rejection rolls the
/// optimistic change back.
pub struct SyncCoordinator<B> {
    backend: B,
    pending: BTreeMap<RecordId, PendingOp>,
    abandoned: Vec<PendingOp>,
    flush_batch: usize,
    max_attempts: u32,
}

impl<B> SyncCoordinator<B> {
    pub fn new(backend: B) -> Self {
        SyncCoordinator {
            backend,
            pending: BTreeMap::new(),
            abandoned: Vec::new(),
            flush_batch: 10,
            max_attempts: 3,
        }
    }

    /// Set the maximum number of ops one flush pass will drive.
    pub fn with_flush_batch(mut self, size: usize) -> Self {
        self.flush_batch = size;
        self
    }

    /// Set how many unreachable-backend attempts an op gets before it is
    /// abandoned.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_ops(&self) -> impl Iterator<Item = &PendingOp> {
        self.pending.values()
    }

    /// Ops that exhausted their retries or were refused during flush. Local
    /// state for these is untouched; they are kept for diagnostics.
    pub fn abandoned_ops(&self) -> &[PendingOp] {
        &self.abandoned
    }

    /// Queue an op for later reconciliation, coalescing per record id.
    fn queue(&mut self, id: RecordId, kind: PendingKind) {
        match (self.pending.get(&id).map(|op| &op.kind), &kind) {
            // The queued create will flush with the record's current state,
            // which already carries the rename.
            (Some(PendingKind::Create), PendingKind::Rename) => {}
            // Deleting a record the remote never saw cancels the queued
            // create; there is nothing left to reconcile.
            (Some(PendingKind::Create), PendingKind::Delete { .. }) => {
                self.pending.remove(&id);
                debug!("queued create for {} cancelled by local delete", id);
            }
            _ => {
                debug!("queueing {} for {}", kind.name(), id);
                self.pending.insert(id.clone(), PendingOp::new(id, kind));
            }
        }
    }
}

impl<B: RemoteBackend> SyncCoordinator<B> {
    /// Insert a record locally, then persist it remotely.
    pub async fn create(
        &mut self,
        store: &mut RevisionedStore,
        record: Record,
    ) -> SyncOutcome<RecordId> {
        let id = record.id.clone();
        store.insert(record.clone());

        match self.backend.persist_insert(&record).await {
            Ok(()) => {
                self.pending.remove(&id);
                SyncOutcome::Success {
                    value: id,
                    state: SyncState::Synced,
                }
            }
            Err(RemoteError::Unreachable) => {
                self.queue(id.clone(), PendingKind::Create);
                SyncOutcome::Success {
                    value: id,
                    state: SyncState::QueuedLocal,
                }
            }
            Err(RemoteError::Rejected { reason }) => {
                store.remove(&id);
                warn!("create of {} rejected remotely, rolled back: {}", id, reason);
                SyncOutcome::Failure {
                    error: SyncError::RemoteRejected { id, reason },
                }
            }
        }
    }

    /// Retitle a record locally, then persist the update remotely.
    pub async fn rename(
        &mut self,
        store: &mut RevisionedStore,
        id: &RecordId,
        new_title: impl Into<String>,
    ) -> SyncOutcome<RecordId> {
        let prev = match store.get(id) {
            Some(record) if record.deleted => {
                return SyncOutcome::Failure {
                    error: SyncError::AlreadyDeleted(id.clone()),
                }
            }
            Some(record) => record.clone(),
            None => {
                return SyncOutcome::Failure {
                    error: SyncError::RecordMissing(id.clone()),
                }
            }
        };

        let new_title = new_title.into();
        let mut updated = prev.clone();
        updated.title = new_title.clone();
        store.update(id, |record| record.title = new_title);

        match self.backend.persist_update(&updated).await {
            Ok(()) => {
                self.pending.remove(id);
                SyncOutcome::Success {
                    value: id.clone(),
                    state: SyncState::Synced,
                }
            }
            Err(RemoteError::Unreachable) => {
                self.queue(id.clone(), PendingKind::Rename);
                SyncOutcome::Success {
                    value: id.clone(),
                    state: SyncState::QueuedLocal,
                }
            }
            Err(RemoteError::Rejected { reason }) => {
                store.update(id, |record| record.title = prev.title.clone());
                warn!("rename of {} rejected remotely, rolled back: {}", id, reason);
                SyncOutcome::Failure {
                    error: SyncError::RemoteRejected {
                        id: id.clone(),
                        reason,
                    },
                }
            }
        }
    }

    /// Remove a record locally, then persist the deletion remotely. The
    /// removed record is flagged deleted and held in the ledger until
    /// confirmation; a remote rejection reinstates it.
    pub async fn delete(
        &mut self,
        store: &mut RevisionedStore,
        id: &RecordId,
    ) -> SyncOutcome<RecordId> {
        if store.get(id).map(|r| r.deleted).unwrap_or(false) {
            return SyncOutcome::Failure {
                error: SyncError::AlreadyDeleted(id.clone()),
            };
        }
        let Some(mut record) = store.remove(id) else {
            return SyncOutcome::Failure {
                error: SyncError::RecordMissing(id.clone()),
            };
        };
        record.deleted = true;

        match self.backend.persist_delete(id).await {
            Ok(()) => {
                self.pending.remove(id);
                SyncOutcome::Success {
                    value: id.clone(),
                    state: SyncState::Synced,
                }
            }
            Err(RemoteError::Unreachable) => {
                self.queue(id.clone(), PendingKind::Delete { record });
                SyncOutcome::Success {
                    value: id.clone(),
                    state: SyncState::QueuedLocal,
                }
            }
            Err(RemoteError::Rejected { reason }) => {
                record.deleted = false;
                store.insert(record);
                warn!("delete of {} rejected remotely, reinstated: {}", id, reason);
                SyncOutcome::Failure {
                    error: SyncError::RemoteRejected {
                        id: id.clone(),
                        reason,
                    },
                }
            }
        }
    }

    /// Remove a batch of records with a single revision bump, then persist
    /// the deletions remotely with per-item results.
    ///
    /// Items the remote confirmed stay removed even when siblings fail, and
    /// failed items are NOT rolled back either: their local removal is still
    /// valid, only remote confirmation is pending, so they join the ledger.
    pub async fn delete_batch(
        &mut self,
        store: &mut RevisionedStore,
        ids: &[RecordId],
    ) -> SyncOutcome<RecordId> {
        let mut failed: Vec<(RecordId, SyncError)> = Vec::new();
        let mut present: Vec<RecordId> = Vec::new();
        for id in ids {
            match store.get(id) {
                Some(record) if record.deleted => {
                    failed.push((id.clone(), SyncError::AlreadyDeleted(id.clone())))
                }
                Some(_) => present.push(id.clone()),
                None => failed.push((id.clone(), SyncError::RecordMissing(id.clone()))),
            }
        }

        let mut removed: BTreeMap<RecordId, Record> = store
            .remove_batch(&present)
            .into_iter()
            .map(|mut record| {
                record.deleted = true;
                (record.id.clone(), record)
            })
            .collect();

        let mut succeeded = Vec::new();
        if !present.is_empty() {
            for (id, result) in self.backend.persist_delete_batch(&present).await {
                match result {
                    Ok(()) => {
                        self.pending.remove(&id);
                        succeeded.push(id);
                    }
                    Err(err) => {
                        let sync_err = match &err {
                            RemoteError::Rejected { reason } => SyncError::RemoteRejected {
                                id: id.clone(),
                                reason: reason.clone(),
                            },
                            RemoteError::Unreachable => SyncError::RemoteUnreachable(id.clone()),
                        };
                        if let Some(record) = removed.remove(&id) {
                            self.queue(id.clone(), PendingKind::Delete { record });
                        }
                        failed.push((id, sync_err));
                    }
                }
            }
        }

        SyncOutcome::Partial { succeeded, failed }
    }

    /// Drive queued ops against the backend, up to the flush batch size.
    ///
    /// Create/rename ops replay the record's current store state; if the
    /// record is gone the op was superseded and is dropped without error.
    /// An op whose backend stays unreachable is requeued until its attempts
    /// run out, then abandoned. A conclusive rejection during flush also
    /// abandons the op: local state is still valid and kept.
    pub async fn flush(&mut self, store: &RevisionedStore) -> FlushReport {
        let mut report = FlushReport::default();
        let batch: Vec<RecordId> = self
            .pending
            .iter()
            .filter(|(_, op)| op.status == PendingStatus::Pending)
            .take(self.flush_batch)
            .map(|(id, _)| id.clone())
            .collect();

        for id in batch {
            let Some(mut op) = self.pending.remove(&id) else {
                continue;
            };

            // Create/rename replay the record's current state. A record
            // that vanished since queueing means a later mutation won.
            let replay = match &op.kind {
                PendingKind::Delete { .. } => None,
                _ => match store.get(&id) {
                    Some(record) => Some(record.clone()),
                    None => {
                        debug!(
                            "flush: {} for {} superseded locally, dropped",
                            op.kind.name(),
                            id
                        );
                        report.superseded += 1;
                        continue;
                    }
                },
            };

            op.begin_attempt();
            report.attempted += 1;

            let result = match (&op.kind, &replay) {
                (PendingKind::Create, Some(record)) => {
                    self.backend.persist_insert(record).await
                }
                (PendingKind::Rename, Some(record)) => {
                    self.backend.persist_update(record).await
                }
                _ => self.backend.persist_delete(&id).await,
            };

            match result {
                Ok(()) => {
                    op.confirm();
                    report.confirmed += 1;
                    debug!("flush: {} for {} confirmed", op.kind.name(), id);
                }
                Err(RemoteError::Unreachable) => {
                    if op.attempts >= self.max_attempts {
                        warn!(
                            "flush: abandoning {} for {} after {} attempts",
                            op.kind.name(),
                            id,
                            op.attempts
                        );
                        op.abandon("retries exhausted: remote unreachable");
                        report.abandoned += 1;
                        self.abandoned.push(op);
                    } else {
                        op.requeue(RemoteError::Unreachable.to_string());
                        report.requeued += 1;
                        self.pending.insert(id, op);
                    }
                }
                Err(err @ RemoteError::Rejected { .. }) => {
                    warn!("flush: {} for {} refused, keeping local state: {}", op.kind.name(), id, err);
                    op.abandon(err.to_string());
                    report.abandoned += 1;
                    self.abandoned.push(op);
                }
            }
        }

        report
    }
}
