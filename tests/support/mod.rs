#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pulpit::{
    AssetKey, LargeObjectStore, MaterializeError, ProcessingStatus, Record, RecordId,
    RemoteBackend, RemoteError, RemoteResult,
};

/// Remote backend whose behavior is scripted from the test: it can be taken
/// offline as a whole, or told to reject specific record ids. Every call is
/// logged for ordering assertions.
pub struct ScriptedBackend {
    offline: Mutex<bool>,
    rejections: Mutex<HashMap<RecordId, String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn online() -> Arc<Self> {
        Arc::new(ScriptedBackend {
            offline: Mutex::new(false),
            rejections: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn offline() -> Arc<Self> {
        let backend = Self::online();
        backend.set_offline(true);
        backend
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn reject(&self, id: impl Into<RecordId>, reason: &str) {
        self.rejections
            .lock()
            .unwrap()
            .insert(id.into(), reason.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn respond(&self, op: &str, id: &RecordId) -> RemoteResult {
        self.calls.lock().unwrap().push(format!("{} {}", op, id));
        if *self.offline.lock().unwrap() {
            return Err(RemoteError::Unreachable);
        }
        if let Some(reason) = self.rejections.lock().unwrap().get(id) {
            return Err(RemoteError::Rejected {
                reason: reason.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteBackend for ScriptedBackend {
    async fn persist_insert(&self, record: &Record) -> RemoteResult {
        self.respond("insert", &record.id)
    }

    async fn persist_update(&self, record: &Record) -> RemoteResult {
        self.respond("update", &record.id)
    }

    async fn persist_delete(&self, id: &RecordId) -> RemoteResult {
        self.respond("delete", id)
    }

    async fn persist_delete_batch(&self, ids: &[RecordId]) -> Vec<(RecordId, RemoteResult)> {
        ids.iter()
            .map(|id| (id.clone(), self.respond("delete_batch", id)))
            .collect()
    }
}

/// Object store preloaded with blobs; counts materializations so tests can
/// assert the cache only goes to it on a miss.
pub struct ScriptedObjectStore {
    blobs: Mutex<HashMap<AssetKey, Vec<u8>>>,
    materializations: Mutex<usize>,
}

impl ScriptedObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(ScriptedObjectStore {
            blobs: Mutex::new(HashMap::new()),
            materializations: Mutex::new(0),
        })
    }

    pub fn preload(&self, key: AssetKey, bytes: Vec<u8>) {
        self.blobs.lock().unwrap().insert(key, bytes);
    }

    pub fn materializations(&self) -> usize {
        *self.materializations.lock().unwrap()
    }
}

#[async_trait]
impl LargeObjectStore for ScriptedObjectStore {
    async fn materialize(&self, key: &AssetKey) -> Result<Vec<u8>, MaterializeError> {
        *self.materializations.lock().unwrap() += 1;
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| MaterializeError::NotFound(key.clone()))
    }
}

/// A record with a deterministic timestamp so sort assertions are stable.
pub fn record(id: &str, title: &str, day: u32) -> Record {
    Record::new(id, title)
        .with_status(ProcessingStatus::Ready)
        .with_created_at(Utc.with_ymd_and_hms(2026, 8, day, 9, 0, 0).unwrap())
}
