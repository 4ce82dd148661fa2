//! Optimistic local mutation reconciled against a remote backend.
//!
//! Local truth updates first; the remote call happens while the store is
//! already readable. Outcomes come back as [`SyncOutcome`] values - pure
//! data the presentation layer turns into toasts or alerts. Mutations the
//! backend could not confirm live on in a pending-op ledger that
//! [`SyncCoordinator::flush`] reconciles out of band.

mod backend;
mod coordinator;
mod outcome;
mod pending;

pub use backend::{LargeObjectStore, MaterializeError, RemoteBackend, RemoteError, RemoteResult};
pub use coordinator::{FlushReport, SyncCoordinator};
pub use outcome::{ErrorScope, SyncError, SyncOutcome, SyncState};
pub use pending::{PendingKind, PendingOp, PendingStatus};
