//! Configuration for the offline queue and the background sync engine.
//!
//! All timing, retry and retention constants live here so the composition root can tune them
//! (tests shrink the timers, the demo binary uses the defaults).

use crate::offline::OfflineSyncError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Keys under which each record is stored in the durable medium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
	/// Cached staking snapshot.
	pub snapshot: String,
	/// Pending operation queue.
	pub queue: String,
	/// Last known offline status.
	pub offline_status: String,
}

impl Default for StorageKeys {
	fn default() -> Self {
		Self {
			snapshot: "crystal_stakes_staking_data".to_string(),
			queue: "crystal_stakes_transaction_queue".to_string(),
			offline_status: "crystal_stakes_offline_status".to_string(),
		}
	}
}

/// Configuration for the sync engine and the offline entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// Failed attempts after which a queued operation is abandoned.
	pub max_retries: u32,
	/// Delay between an unreachable -> reachable transition and the sync it triggers.
	pub reconnect_grace: Duration,
	/// Interval of the periodic sync trigger.
	pub sync_interval: Duration,
	/// Delay of the one-off sync check after `start()`.
	pub startup_delay: Duration,
	/// Interval of the periodic cleanup routine.
	pub cleanup_interval: Duration,
	/// Age at which a cached snapshot stops being returned by reads.
	pub snapshot_ttl: Duration,
	/// Age at which the cleanup routine purges a cached snapshot.
	pub snapshot_max_age: Duration,
	/// Age at which the cleanup routine purges a queued operation.
	pub queue_max_age: Duration,
	/// Storage keys.
	pub keys: StorageKeys,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			max_retries: 3,
			reconnect_grace: Duration::from_secs(1),
			sync_interval: Duration::from_secs(5 * 60),
			startup_delay: Duration::from_secs(2),
			cleanup_interval: 24 * HOUR,
			snapshot_ttl: 24 * HOUR,
			snapshot_max_age: 7 * 24 * HOUR,
			queue_max_age: 24 * HOUR,
			keys: StorageKeys::default(),
		}
	}
}

impl SyncConfig {
	/// Sets the maximum number of attempts per operation.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;
		self
	}

	/// Sets the reconnect grace period.
	pub fn with_reconnect_grace(mut self, grace: Duration) -> Self {
		self.reconnect_grace = grace;
		self
	}

	/// Sets the periodic sync interval.
	pub fn with_sync_interval(mut self, interval: Duration) -> Self {
		self.sync_interval = interval;
		self
	}

	/// Sets the startup check delay.
	pub fn with_startup_delay(mut self, delay: Duration) -> Self {
		self.startup_delay = delay;
		self
	}

	/// Sets the cleanup interval.
	pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
		self.cleanup_interval = interval;
		self
	}

	/// Sets the storage keys.
	pub fn with_keys(mut self, keys: StorageKeys) -> Self {
		self.keys = keys;
		self
	}

	/// Rejects settings the background tasks cannot run with.
	pub fn validate(&self) -> Result<(), OfflineSyncError> {
		let timers = [
			("sync_interval", self.sync_interval),
			("cleanup_interval", self.cleanup_interval),
		];
		for (name, value) in timers {
			if value.is_zero() {
				return Err(OfflineSyncError::InvalidConfig(format!(
					"{} must be greater than zero",
					name
				)));
			}
		}
		if self.max_retries == 0 {
			return Err(OfflineSyncError::InvalidConfig(
				"max_retries must be at least 1".to_string(),
			));
		}
		Ok(())
	}

	pub(crate) fn snapshot_ttl_ms(&self) -> i64 {
		duration_ms(self.snapshot_ttl)
	}

	pub(crate) fn snapshot_max_age_ms(&self) -> i64 {
		duration_ms(self.snapshot_max_age)
	}

	pub(crate) fn queue_max_age_ms(&self) -> i64 {
		duration_ms(self.queue_max_age)
	}
}

fn duration_ms(duration: Duration) -> i64 {
	i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
