mod cache;
mod library;
mod query;
mod record;
mod store;
mod sync;

pub use cache::{AssetKey, AssetKind, BoundedAssetCache};
pub use library::{ChangeNotice, Library};
pub use query::{FilterOption, GroupOption, Memo, QueryKey, SortOption};
pub use record::{ProcessingStatus, Record, RecordId};
pub use store::RevisionedStore;
pub use sync::{
    ErrorScope, FlushReport, LargeObjectStore, MaterializeError, PendingKind, PendingOp,
    PendingStatus, RemoteBackend, RemoteError, RemoteResult, SyncCoordinator, SyncError,
    SyncOutcome, SyncState,
};

#[cfg(feature = "emitter")]
pub use library::CHANGED_EVENT;

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
