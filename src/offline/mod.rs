//! Offline entities
//!
//! The records a disconnected client keeps locally and the read/write seam exposed to the
//! presentation layer:
//!
//! - `snapshot_cache`: time-boxed cache of the user's staking position.
//! - `operation_queue`: ordered, durable queue of stake/unstake/claim operations with retry counters.
//! - `status`: last recorded connectivity state.
//! - `facade`: single read/write seam over all of the above plus reachability.

pub mod facade;
pub mod operation_queue;
pub mod snapshot_cache;
pub mod status;
pub mod types;

pub use facade::{CleanupReport, OfflineFacade};
pub use operation_queue::{FailureOutcome, OperationQueue};
pub use snapshot_cache::SnapshotCache;
pub use status::OfflineStatusStore;
pub use types::*;
