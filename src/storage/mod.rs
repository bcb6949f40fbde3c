//! Durable key-value medium
//!
//! The offline entities persist each of their records as a single string blob under its own key.
//! This module defines the medium contract they consume and ships two implementations: an
//! in-memory store for tests and ephemeral sessions, and a file-backed store for real use.

/// File-backed store, one file per key
mod file;
/// In-memory store
mod memory;
/// Versioned envelope around every persisted record
pub mod record;

pub use file::FileStore;
pub use memory::InMemoryStore;

use crate::offline::OfflineSyncError;

/// Synchronous, process-local string store.
///
/// Implementations only move blobs around; they never interpret them. Each entity treats its
/// updates as read-then-full-rewrite, so a single writer process is assumed.
pub trait KeyValueStore: Send + Sync {
	/// Returns the blob stored under `key`, if any.
	fn get(&self, key: &str) -> Result<Option<String>, OfflineSyncError>;

	/// Stores `value` under `key`, replacing any previous blob.
	fn set(&self, key: &str, value: &str) -> Result<(), OfflineSyncError>;

	/// Removes the blob stored under `key`. Removing a missing key is not an error.
	fn remove(&self, key: &str) -> Result<(), OfflineSyncError>;
}
