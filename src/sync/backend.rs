use async_trait::async_trait;
use thiserror::Error;

use crate::cache::AssetKey;
use crate::record::{Record, RecordId};

/// A conclusive remote refusal, or the absence of a conclusive answer.
///
/// `Unreachable` is deliberately not a rejection: the local write stands and
/// the operation is reported as queued. The backend's own retry/timeout
/// policy decides when to give up and answer `Unreachable`; this layer never
/// blocks waiting for it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote rejected the operation: {reason}")]
    Rejected { reason: String },
    #[error("remote backend unreachable")]
    Unreachable,
}

pub type RemoteResult = Result<(), RemoteError>;

/// The remote backend that durably persists records. Opaque async RPC
/// surface; this layer only interprets the three result shapes.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn persist_insert(&self, record: &Record) -> RemoteResult;
    async fn persist_update(&self, record: &Record) -> RemoteResult;
    async fn persist_delete(&self, id: &RecordId) -> RemoteResult;

    /// Batch delete with per-item results. Order matches the input ids.
    async fn persist_delete_batch(&self, ids: &[RecordId]) -> Vec<(RecordId, RemoteResult)>;
}

#[async_trait]
impl<T: RemoteBackend + ?Sized> RemoteBackend for std::sync::Arc<T> {
    async fn persist_insert(&self, record: &Record) -> RemoteResult {
        (**self).persist_insert(record).await
    }

    async fn persist_update(&self, record: &Record) -> RemoteResult {
        (**self).persist_update(record).await
    }

    async fn persist_delete(&self, id: &RecordId) -> RemoteResult {
        (**self).persist_delete(id).await
    }

    async fn persist_delete_batch(&self, ids: &[RecordId]) -> Vec<(RecordId, RemoteResult)> {
        (**self).persist_delete_batch(ids).await
    }
}

/// Why a derived asset could not be materialized.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MaterializeError {
    #[error("asset {0} not found in the object store")]
    NotFound(AssetKey),
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// The store that holds bulky derived assets (rendered audio, transcript
/// segments), addressed by record id and kind. Consulted only on cache miss.
#[async_trait]
pub trait LargeObjectStore: Send + Sync {
    async fn materialize(&self, key: &AssetKey) -> Result<Vec<u8>, MaterializeError>;
}

#[async_trait]
impl<T: LargeObjectStore + ?Sized> LargeObjectStore for std::sync::Arc<T> {
    async fn materialize(&self, key: &AssetKey) -> Result<Vec<u8>, MaterializeError> {
        (**self).materialize(key).await
    }
}
