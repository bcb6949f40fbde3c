use crate::clock::Clock;
use crate::offline::OfflineStatus;
use crate::storage::{KeyValueStore, record};
use std::sync::Arc;
use tracing::{error, warn};

/// Persists the last observed connectivity state
pub struct OfflineStatusStore {
	store: Arc<dyn KeyValueStore>,
	clock: Arc<dyn Clock>,
	key: String,
}

impl OfflineStatusStore {
	pub fn new(
		store: Arc<dyn KeyValueStore>,
		clock: Arc<dyn Clock>,
		key: impl Into<String>,
	) -> Self {
		Self {
			store,
			clock,
			key: key.into(),
		}
	}

	pub fn set(&self, is_offline: bool) {
		let status = OfflineStatus {
			is_offline,
			timestamp: self.clock.now_millis(),
		};
		if let Err(e) = record::encode(&status).and_then(|raw| self.store.set(&self.key, &raw)) {
			error!("Failed to save offline status: {}", e);
		}
	}

	pub fn get(&self) -> Option<OfflineStatus> {
		let raw = match self.store.get(&self.key) {
			Ok(raw) => raw?,
			Err(e) => {
				error!("Failed to retrieve offline status: {}", e);
				return None;
			}
		};
		record::decode(&raw).unwrap_or_else(|e| {
			warn!("Ignoring corrupted offline status: {}", e);
			None
		})
	}
}
