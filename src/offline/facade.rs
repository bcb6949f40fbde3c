//! Single read/write seam over the offline entities.
//!
//! `OfflineFacade` composes the snapshot cache, the operation queue, the offline status record
//! and the connectivity monitor. It performs no business logic of its own.

use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::offline::{
	OfflineStatus, OfflineStatusStore, OperationKind, OperationQueue, Payload, QueuedOperation,
	SnapshotCache, StakingSnapshot,
};
use crate::storage::KeyValueStore;
use crate::sync::connectivity::{ConnectivityMonitor, ReachabilityProbe};
use std::sync::Arc;
use tracing::info;

/// What a cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
	pub operations_purged: usize,
	pub snapshot_purged: bool,
}

pub struct OfflineFacade {
	snapshot: SnapshotCache,
	queue: Arc<OperationQueue>,
	status: Arc<OfflineStatusStore>,
	connectivity: ConnectivityMonitor,
	clock: Arc<dyn Clock>,
	config: SyncConfig,
}

impl OfflineFacade {
	/// Builds every offline entity over `store`, with the initial reachability read from `probe`.
	pub fn new(
		store: Arc<dyn KeyValueStore>,
		clock: Arc<dyn Clock>,
		probe: &dyn ReachabilityProbe,
		config: SyncConfig,
	) -> Self {
		let keys = &config.keys;
		let snapshot = SnapshotCache::new(
			store.clone(),
			clock.clone(),
			keys.snapshot.clone(),
			config.snapshot_ttl_ms(),
		);
		let queue = Arc::new(OperationQueue::new(
			store.clone(),
			clock.clone(),
			keys.queue.clone(),
		));
		let status = Arc::new(OfflineStatusStore::new(
			store,
			clock.clone(),
			keys.offline_status.clone(),
		));
		let connectivity = ConnectivityMonitor::new(probe).with_status_record(status.clone());

		Self {
			snapshot,
			queue,
			status,
			connectivity,
			clock,
			config,
		}
	}

	/// Handle to the queue shared with the sync orchestrator.
	pub fn queue(&self) -> Arc<OperationQueue> {
		self.queue.clone()
	}

	/// Handle to the connectivity monitor; platform signals are reported through it.
	pub fn connectivity(&self) -> ConnectivityMonitor {
		self.connectivity.clone()
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn is_reachable(&self) -> bool {
		self.connectivity.is_reachable()
	}

	pub fn is_offline(&self) -> bool {
		!self.is_reachable()
	}

	pub fn offline_status(&self) -> Option<OfflineStatus> {
		self.status.get()
	}

	pub fn snapshot(&self) -> Option<StakingSnapshot> {
		self.snapshot.read()
	}

	pub fn pending_operations(&self) -> Vec<QueuedOperation> {
		self.queue.read_all()
	}

	pub fn save_snapshot(&self, snapshot: StakingSnapshot) -> StakingSnapshot {
		self.snapshot.save(snapshot)
	}

	pub fn clear_snapshot(&self) {
		self.snapshot.clear()
	}

	pub fn enqueue(&self, kind: OperationKind, payload: Payload) -> String {
		self.queue.enqueue(kind, payload)
	}

	pub fn remove(&self, id: &str) {
		self.queue.remove(id)
	}

	pub fn increment_retry(&self, id: &str) {
		self.queue.increment_retry(id)
	}

	pub fn clear_queue(&self) {
		self.queue.clear()
	}

	/// Purges expired operations and an outdated snapshot.
	pub fn run_cleanup(&self) -> CleanupReport {
		let now = self.clock.now_millis();
		let report = CleanupReport {
			operations_purged: self
				.queue
				.purge_older_than(self.config.queue_max_age_ms(), now),
			snapshot_purged: self
				.snapshot
				.purge_older_than(self.config.snapshot_max_age_ms(), now),
		};

		if report.operations_purged > 0 || report.snapshot_purged {
			info!(
				"Cleanup removed {} expired operations (snapshot purged: {})",
				report.operations_purged, report.snapshot_purged
			);
		}
		report
	}
}
