//! Time-boxed cache of the user's staking position.
//!
//! The cache holds at most one snapshot. Reads only return it while it is younger than the
//! configured TTL; a stale snapshot is cleared on the read that detects it. Corrupted blobs read
//! as absent and are never surfaced to the caller.

use crate::clock::Clock;
use crate::offline::StakingSnapshot;
use crate::storage::{KeyValueStore, record};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct SnapshotCache {
	store: Arc<dyn KeyValueStore>,
	clock: Arc<dyn Clock>,
	key: String,
	ttl_ms: i64,
}

impl SnapshotCache {
	pub fn new(
		store: Arc<dyn KeyValueStore>,
		clock: Arc<dyn Clock>,
		key: impl Into<String>,
		ttl_ms: i64,
	) -> Self {
		Self {
			store,
			clock,
			key: key.into(),
			ttl_ms,
		}
	}

	/// Overwrites the cached snapshot, stamping `last_updated` with the current time.
	///
	/// Returns the snapshot as stored.
	pub fn save(&self, snapshot: StakingSnapshot) -> StakingSnapshot {
		let snapshot = StakingSnapshot {
			last_updated: self.clock.now_millis(),
			..snapshot
		};

		match record::encode(&snapshot).and_then(|raw| self.store.set(&self.key, &raw)) {
			Ok(()) => debug!("Saved staking snapshot for {}", snapshot.address),
			Err(e) => error!("Failed to save staking snapshot: {}", e),
		}
		snapshot
	}

	/// Returns the cached snapshot if it is younger than the TTL.
	pub fn read(&self) -> Option<StakingSnapshot> {
		let snapshot = self.load()?;
		let age = self.clock.now_millis() - snapshot.last_updated;
		if age >= self.ttl_ms {
			info!("Staking snapshot is stale ({} ms old), clearing", age);
			self.clear();
			return None;
		}
		Some(snapshot)
	}

	/// Removes any cached snapshot.
	pub fn clear(&self) {
		if let Err(e) = self.store.remove(&self.key) {
			error!("Failed to clear staking snapshot: {}", e);
		}
	}

	/// Removes the cached snapshot if it is older than `max_age_ms` at `now`.
	///
	/// Returns whether a snapshot was purged.
	pub fn purge_older_than(&self, max_age_ms: i64, now: i64) -> bool {
		match self.load() {
			Some(snapshot) if now - snapshot.last_updated > max_age_ms => {
				info!(
					"Purging staking snapshot last updated at {}",
					snapshot.last_updated
				);
				self.clear();
				true
			}
			_ => false,
		}
	}

	/// Reads the stored snapshot regardless of age.
	fn load(&self) -> Option<StakingSnapshot> {
		let raw = match self.store.get(&self.key) {
			Ok(Some(raw)) => raw,
			Ok(None) => return None,
			Err(e) => {
				error!("Failed to retrieve staking snapshot: {}", e);
				return None;
			}
		};

		match record::decode::<StakingSnapshot>(&raw) {
			Ok(snapshot) => snapshot,
			Err(e) => {
				warn!("Ignoring corrupted staking snapshot: {}", e);
				None
			}
		}
	}
}
