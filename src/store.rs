//! RevisionedStore - the single source of local truth for records.
//!
//! Every successful mutation bumps a monotonic revision counter exactly once,
//! batches included. The revision doubles as a freshness token: query caches
//! key on it, so a bump is what invalidates them. Mutations that change
//! nothing (missing id) deliberately leave the revision alone to avoid
//! spurious invalidation.

use std::collections::BTreeMap;

use log::debug;

use crate::record::{Record, RecordId};

/// In-memory, identity-ordered collection of records plus a revision counter.
///
/// The store itself cannot fail; remote persistence failures belong to the
/// sync layer. Intended to be owned by a single serialized context, so it
/// carries no internal locking.
#[derive(Debug, Default)]
pub struct RevisionedStore {
    records: BTreeMap<RecordId, Record>,
    revision: u64,
}

impl RevisionedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current revision. Strictly increases, one step per successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    /// All records in identity order. Clones, so the caller can hold the
    /// result across later mutations.
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }

    /// Insert or replace a record. Always bumps the revision.
    pub fn insert(&mut self, record: Record) {
        debug!("store insert {} (revision {})", record.id, self.revision + 1);
        self.records.insert(record.id.clone(), record);
        self.bump();
    }

    /// Insert a batch of records with a single revision bump, so a reader
    /// never observes a torn intermediate state. Empty batches are no-ops.
    pub fn insert_batch(&mut self, records: Vec<Record>) {
        if records.is_empty() {
            return;
        }
        let count = records.len();
        for record in records {
            self.records.insert(record.id.clone(), record);
        }
        self.bump();
        debug!("store insert_batch of {} (revision {})", count, self.revision);
    }

    /// Mutate a record in place. Returns false (and does not bump) when the
    /// id is absent.
    pub fn update(&mut self, id: &RecordId, mutator: impl FnOnce(&mut Record)) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                mutator(record);
                self.bump();
                debug!("store update {} (revision {})", id, self.revision);
                true
            }
            None => false,
        }
    }

    /// Remove a record, returning it. Missing ids are revision-preserving
    /// no-ops.
    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        let removed = self.records.remove(id);
        if removed.is_some() {
            self.bump();
            debug!("store remove {} (revision {})", id, self.revision);
        }
        removed
    }

    /// Remove a batch of records with a single revision bump. The bump
    /// happens iff at least one id was present. Returns the removed records.
    pub fn remove_batch(&mut self, ids: &[RecordId]) -> Vec<Record> {
        let mut removed = Vec::new();
        for id in ids {
            if let Some(record) = self.records.remove(id) {
                removed.push(record);
            }
        }
        if !removed.is_empty() {
            self.bump();
            debug!(
                "store remove_batch of {} (revision {})",
                removed.len(),
                self.revision
            );
        }
        removed
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        Record::new(id, format!("title-{}", id))
    }

    #[test]
    fn revision_strictly_increases_once_per_mutation() {
        let mut store = RevisionedStore::new();
        assert_eq!(store.revision(), 0);

        store.insert(record("a"));
        assert_eq!(store.revision(), 1);

        store.update(&"a".into(), |r| r.title = "renamed".into());
        assert_eq!(store.revision(), 2);

        store.remove(&"a".into());
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn batch_operations_bump_exactly_once() {
        let mut store = RevisionedStore::new();
        store.insert_batch(vec![record("a"), record("b"), record("c")]);
        assert_eq!(store.revision(), 1);
        assert_eq!(store.len(), 3);

        let removed = store.remove_batch(&["a".into(), "b".into()]);
        assert_eq!(removed.len(), 2);
        assert_eq!(store.revision(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_id_mutations_are_revision_preserving() {
        let mut store = RevisionedStore::new();
        store.insert(record("a"));
        let before = store.revision();

        assert!(!store.update(&"ghost".into(), |r| r.title = "x".into()));
        assert!(store.remove(&"ghost".into()).is_none());
        assert!(store.remove_batch(&["ghost".into(), "wraith".into()]).is_empty());
        store.insert_batch(Vec::new());

        assert_eq!(store.revision(), before);
    }

    #[test]
    fn remove_batch_with_partial_presence_bumps_once() {
        let mut store = RevisionedStore::new();
        store.insert_batch(vec![record("a"), record("b")]);
        let before = store.revision();

        let removed = store.remove_batch(&["a".into(), "ghost".into()]);
        assert_eq!(removed.len(), 1);
        assert_eq!(store.revision(), before + 1);
    }

    #[test]
    fn snapshot_is_identity_ordered() {
        let mut store = RevisionedStore::new();
        store.insert(record("c"));
        store.insert(record("a"));
        store.insert(record("b"));

        let ids: Vec<String> = store
            .snapshot()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn mutation_visible_before_return() {
        let mut store = RevisionedStore::new();
        store.insert(record("a"));
        store.update(&"a".into(), |r| r.title = "renamed".into());
        assert_eq!(store.get(&"a".into()).unwrap().title, "renamed");
    }
}
