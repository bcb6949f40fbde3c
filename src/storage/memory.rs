use crate::offline::OfflineSyncError;
use crate::storage::KeyValueStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory implementation of KeyValueStore
#[derive(Debug, Default)]
pub struct InMemoryStore {
	entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of keys currently stored.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}

impl KeyValueStore for InMemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, OfflineSyncError> {
		Ok(self.entries.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), OfflineSyncError> {
		self.entries
			.write()
			.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), OfflineSyncError> {
		self.entries.write().remove(key);
		Ok(())
	}
}
