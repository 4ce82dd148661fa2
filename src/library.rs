//! Library - the per-session owner of store, caches, and sync.
//!
//! One instance per session, constructed at startup and passed by handle to
//! whatever needs it. All reads and mutations go through `&mut self`, which
//! is what serializes access to the store, the memo sites, and the asset
//! cache; the only suspension point is the remote call inside a mutation,
//! issued after the optimistic local write.

use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

use crate::cache::{AssetKey, AssetKind, BoundedAssetCache};
use crate::query::{self, FilterOption, GroupOption, Memo, QueryKey, SortOption};
use crate::record::{Record, RecordId};
use crate::store::RevisionedStore;
use crate::sync::{
    FlushReport, LargeObjectStore, MaterializeError, PendingOp, RemoteBackend, SyncCoordinator,
    SyncOutcome,
};

/// Event name the library emits whenever the store revision moves.
#[cfg(feature = "emitter")]
pub const CHANGED_EVENT: &str = "library:changed";

/// Payload of a change notification, serialized as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub revision: u64,
}

/// The read-and-mutate surface the presentation layer talks to.
///
/// Query results are memoized per site (filtered, grouped, searched) under a
/// [`QueryKey`] that includes the store revision, so a presentation read
/// after an unrelated refresh is O(1) and any mutation invalidates exactly
/// by moving the revision. Mutations return a [`SyncOutcome`] for the caller
/// to render.
pub struct Library<B, O> {
    store: RevisionedStore,
    coordinator: SyncCoordinator<B>,
    objects: O,
    assets: BoundedAssetCache,
    filtered_memo: Memo<QueryKey, Vec<Record>>,
    grouped_memo: Memo<QueryKey, Vec<(String, Vec<Record>)>>,
    search_memo: Memo<QueryKey, Vec<Record>>,
    #[cfg(feature = "emitter")]
    emitter: EventEmitter,
}

impl<B, O> Library<B, O> {
    pub fn new(backend: B, objects: O) -> Self {
        Self::with_coordinator(SyncCoordinator::new(backend), objects)
    }

    /// Build around a pre-configured coordinator (flush batch, max attempts).
    pub fn with_coordinator(coordinator: SyncCoordinator<B>, objects: O) -> Self {
        Library {
            store: RevisionedStore::new(),
            coordinator,
            objects,
            assets: BoundedAssetCache::default(),
            filtered_memo: Memo::new(),
            grouped_memo: Memo::new(),
            search_memo: Memo::new(),
            #[cfg(feature = "emitter")]
            emitter: EventEmitter::new(),
        }
    }

    /// Set the asset cache byte budget. Replaces the cache, so call this
    /// before populating it.
    pub fn with_asset_budget(mut self, bytes: usize) -> Self {
        self.assets = BoundedAssetCache::new(bytes);
        self
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.store.get(id)
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.store.snapshot()
    }

    pub fn asset_cache(&self) -> &BoundedAssetCache {
        &self.assets
    }

    pub fn pending_len(&self) -> usize {
        self.coordinator.pending_len()
    }

    pub fn pending_ops(&self) -> impl Iterator<Item = &PendingOp> {
        self.coordinator.pending_ops()
    }

    pub fn abandoned_ops(&self) -> &[PendingOp] {
        self.coordinator.abandoned_ops()
    }

    /// Filtered and sorted view of the library. Memoized on
    /// `(revision, filter, sort)`.
    pub fn filtered(&mut self, filter: FilterOption, sort: SortOption) -> Vec<Record> {
        let key = QueryKey::filtered(self.store.revision(), filter, sort);
        let store = &self.store;
        self.filtered_memo
            .compute(key, || query::filtered(&store.snapshot(), filter, sort))
    }

    /// Grouped view. Memoized on `(revision, filter, group, sort)`.
    pub fn grouped(
        &mut self,
        filter: FilterOption,
        group: GroupOption,
        sort: SortOption,
    ) -> Vec<(String, Vec<Record>)> {
        let key = QueryKey::grouped(self.store.revision(), filter, group, sort);
        let store = &self.store;
        self.grouped_memo
            .compute(key, || query::grouped(&store.snapshot(), filter, group, sort))
    }

    /// Title search. Memoized on `(revision, text, filter, sort)`.
    pub fn search(&mut self, text: &str, filter: FilterOption, sort: SortOption) -> Vec<Record> {
        let key = QueryKey::search(self.store.revision(), text, filter, sort);
        let store = &self.store;
        self.search_memo
            .compute(key, || query::searched(&store.snapshot(), text, filter, sort))
    }

    /// Subscribe to change notifications. The listener receives the JSON
    /// serialization of a [`ChangeNotice`]. Returns the listener id.
    #[cfg(feature = "emitter")]
    pub fn on_change<F>(&mut self, listener: F) -> String
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.on(CHANGED_EVENT, listener)
    }

    fn notify_if_changed(&mut self, revision_before: u64) {
        let revision = self.store.revision();
        if revision == revision_before {
            return;
        }
        debug!("library changed, revision {}", revision);
        #[cfg(feature = "emitter")]
        {
            let notice = ChangeNotice { revision };
            if let Ok(payload) = serde_json::to_string(&notice) {
                let _ = self.emitter.emit(CHANGED_EVENT, payload);
            }
        }
    }
}

impl<B: RemoteBackend, O> Library<B, O> {
    /// Add a record. Local truth updates before the remote round-trip.
    pub async fn create(&mut self, record: Record) -> SyncOutcome<RecordId> {
        let before = self.store.revision();
        let outcome = self.coordinator.create(&mut self.store, record).await;
        self.notify_if_changed(before);
        outcome
    }

    /// Retitle a record.
    pub async fn rename(
        &mut self,
        id: &RecordId,
        new_title: impl Into<String>,
    ) -> SyncOutcome<RecordId> {
        let before = self.store.revision();
        let outcome = self.coordinator.rename(&mut self.store, id, new_title).await;
        self.notify_if_changed(before);
        outcome
    }

    /// Delete a record. Assets cached for it are invalidated once it is
    /// locally gone, so no orphaned entries survive.
    pub async fn delete(&mut self, id: &RecordId) -> SyncOutcome<RecordId> {
        let before = self.store.revision();
        let outcome = self.coordinator.delete(&mut self.store, id).await;
        if !self.store.contains(id) {
            self.assets.invalidate_record(id);
        }
        self.notify_if_changed(before);
        outcome
    }

    /// Delete a batch of records with a single revision bump and per-item
    /// remote results.
    pub async fn delete_batch(&mut self, ids: &[RecordId]) -> SyncOutcome<RecordId> {
        let before = self.store.revision();
        let outcome = self.coordinator.delete_batch(&mut self.store, ids).await;
        for id in ids {
            if !self.store.contains(id) {
                self.assets.invalidate_record(id);
            }
        }
        self.notify_if_changed(before);
        outcome
    }

    /// Re-drive queued mutations against the backend.
    pub async fn flush(&mut self) -> FlushReport {
        self.coordinator.flush(&self.store).await
    }
}

impl<B, O: LargeObjectStore> Library<B, O> {
    /// Fetch a derived asset, materializing it into the bounded cache on
    /// miss.
    pub async fn asset(
        &mut self,
        id: &RecordId,
        kind: AssetKind,
    ) -> Result<Vec<u8>, MaterializeError> {
        let key = AssetKey::new(id.clone(), kind);
        if let Some(bytes) = self.assets.get(&key) {
            return Ok(bytes.to_vec());
        }
        let bytes = self.objects.materialize(&key).await?;
        self.assets.put(key, bytes.clone());
        Ok(bytes)
    }
}
