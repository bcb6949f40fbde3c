//! Offline-first staking client core.
//!
//! While the network is unreachable, a staking client keeps working against local state: the last
//! known staking position is served from a time-boxed cache, and state-changing operations
//! (stake, unstake, claim) are appended to a durable queue. Once connectivity returns, the sync
//! orchestrator replays the queue against the remote ledger in order, retrying failures a bounded
//! number of times and reporting every outcome as a lifecycle event.
//!
//! - `storage`: durable key-value medium and the versioned record envelope.
//! - `offline`: snapshot cache, operation queue, offline status record and the facade over them.
//! - `sync`: connectivity monitoring, the sync orchestrator, lifecycle events and periodic cleanup.

pub mod clock;
pub mod config;
pub mod offline;
pub mod storage;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{StorageKeys, SyncConfig};
pub use offline::{
	CleanupReport, OfflineFacade, OfflineSyncError, OperationKind, OperationQueue, Payload,
	QueuedOperation, StakingSnapshot,
};
pub use storage::{FileStore, InMemoryStore, KeyValueStore};
pub use sync::{
	CleanupScheduler, ConnectivityMonitor, ExecutionOutcome, LedgerExecutor, LifecycleEvent,
	LifecycleEventHandler, SyncOrchestrator, SyncTrigger,
};
