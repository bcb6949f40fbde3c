//! Background Synchronization Module
//!
//! This module replays operations queued while offline against the remote ledger once the network
//! is reachable again. It is composed of several submodules:
//!
//! - `orchestrator`: The single-flight state machine that drains the operation queue and owns the trigger sources.
//! - `connectivity`: Reachability state fed by platform signals, and the trigger kinds raised from it.
//! - `executor`: The ledger executor contract and validation of queued payloads into typed requests.
//! - `events`: Lifecycle events and the handler/dispatcher pair used to observe sync outcomes.
//! - `progress_tracker`: Per-episode and cumulative sync statistics.
//! - `cleanup`: Periodic age-based purge of the offline entities.

/// Periodic cleanup routine
pub mod cleanup;
/// Reachability monitoring and sync triggers
pub mod connectivity;
/// Lifecycle event system
pub mod events;
/// Ledger executor contract
pub mod executor;
/// Queue-draining state machine
pub mod orchestrator;
/// Sync episode statistics
pub mod progress_tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use cleanup::CleanupScheduler;
pub use connectivity::{ConnectivityMonitor, ReachabilityProbe, StaticProbe, SyncTrigger};
pub use events::{
	ChannelEventHandler, EventDispatcher, LifecycleEvent, LifecycleEventHandler,
	LoggingEventHandler,
};
pub use executor::{ExecutionOutcome, LedgerExecutor, LedgerRequest};
pub use orchestrator::{SyncOrchestrator, SyncState};
pub use progress_tracker::{EpisodeStats, OrchestratorStats};
