//! Durable, ordered queue of pending operations.
//!
//! The whole queue is persisted as one blob and every mutation is a read-then-full-rewrite.
//! A process-local mutex serializes those sequences so the cleanup routine and a sync episode
//! cannot interleave a read and a write. A corrupted blob reads as an empty queue.

use crate::clock::Clock;
use crate::offline::{OperationKind, Payload, QueuedOperation};
use crate::storage::{KeyValueStore, record};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of recording a failed attempt against a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
	/// The retry count was incremented to the contained attempt number.
	Retrying(u32),
	/// The operation reached the retry limit and was removed after the contained attempts.
	Abandoned(u32),
	/// The operation is no longer queued.
	Missing,
}

pub struct OperationQueue {
	store: Arc<dyn KeyValueStore>,
	clock: Arc<dyn Clock>,
	key: String,
	lock: Mutex<()>,
}

impl OperationQueue {
	pub fn new(
		store: Arc<dyn KeyValueStore>,
		clock: Arc<dyn Clock>,
		key: impl Into<String>,
	) -> Self {
		Self {
			store,
			clock,
			key: key.into(),
			lock: Mutex::new(()),
		}
	}

	/// Appends a new operation and returns its identifier.
	pub fn enqueue(&self, kind: OperationKind, payload: Payload) -> String {
		let _guard = self.lock.lock();
		let mut queue = self.load();

		let now = self.clock.now_millis();
		let mut id = generate_id(now);
		while queue.iter().any(|op| op.id == id) {
			id = generate_id(now);
		}

		queue.push(QueuedOperation {
			id: id.clone(),
			kind,
			payload,
			timestamp: now,
			retry_count: 0,
		});
		self.persist(&queue);

		info!("Queued {} operation {}", kind, id);
		id
	}

	/// Returns all pending operations, oldest first.
	pub fn read_all(&self) -> Vec<QueuedOperation> {
		let _guard = self.lock.lock();
		self.load()
	}

	/// Returns the pending operation with the given id.
	pub fn get(&self, id: &str) -> Option<QueuedOperation> {
		let _guard = self.lock.lock();
		self.load().into_iter().find(|op| op.id == id)
	}

	pub fn len(&self) -> usize {
		self.read_all().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Removes the operation with the given id; absent ids are ignored.
	pub fn remove(&self, id: &str) {
		self.take(id);
	}

	/// Removes and returns the operation with the given id.
	pub fn take(&self, id: &str) -> Option<QueuedOperation> {
		let _guard = self.lock.lock();
		let mut queue = self.load();
		let position = queue.iter().position(|op| op.id == id)?;
		let removed = queue.remove(position);
		self.persist(&queue);
		debug!("Removed operation {} from queue", id);
		Some(removed)
	}

	/// Increments the retry count of the operation with the given id; absent ids are ignored.
	pub fn increment_retry(&self, id: &str) {
		let _guard = self.lock.lock();
		let mut queue = self.load();
		if let Some(op) = queue.iter_mut().find(|op| op.id == id) {
			op.retry_count += 1;
			self.persist(&queue);
		}
	}

	/// Records one failed attempt as a single read-modify-write.
	///
	/// When the attempt number reaches `max_retries` the operation is removed, otherwise its
	/// retry count is incremented.
	pub fn record_failure(&self, id: &str, max_retries: u32) -> FailureOutcome {
		let _guard = self.lock.lock();
		let mut queue = self.load();
		let Some(position) = queue.iter().position(|op| op.id == id) else {
			return FailureOutcome::Missing;
		};

		let attempt = queue[position].retry_count + 1;
		let outcome = if attempt >= max_retries {
			queue.remove(position);
			FailureOutcome::Abandoned(attempt)
		} else {
			queue[position].retry_count = attempt;
			FailureOutcome::Retrying(attempt)
		};
		self.persist(&queue);
		outcome
	}

	/// Removes all pending operations.
	pub fn clear(&self) {
		let _guard = self.lock.lock();
		if let Err(e) = self.store.remove(&self.key) {
			error!("Failed to clear operation queue: {}", e);
		}
	}

	/// Removes every operation enqueued more than `max_age_ms` before `now`, whatever its
	/// retry count. Returns the number of purged operations.
	pub fn purge_older_than(&self, max_age_ms: i64, now: i64) -> usize {
		let _guard = self.lock.lock();
		let queue = self.load();
		let before = queue.len();
		let recent: Vec<QueuedOperation> = queue
			.into_iter()
			.filter(|op| now - op.timestamp <= max_age_ms)
			.collect();

		let purged = before - recent.len();
		if purged > 0 {
			self.persist(&recent);
			info!("Purged {} expired operations from queue", purged);
		}
		purged
	}

	fn load(&self) -> Vec<QueuedOperation> {
		let raw = match self.store.get(&self.key) {
			Ok(Some(raw)) => raw,
			Ok(None) => return Vec::new(),
			Err(e) => {
				error!("Failed to retrieve operation queue: {}", e);
				return Vec::new();
			}
		};

		match record::decode::<Vec<QueuedOperation>>(&raw) {
			Ok(queue) => queue.unwrap_or_default(),
			Err(e) => {
				warn!("Ignoring corrupted operation queue: {}", e);
				Vec::new()
			}
		}
	}

	fn persist(&self, queue: &[QueuedOperation]) {
		if let Err(e) = record::encode(&queue).and_then(|raw| self.store.set(&self.key, &raw)) {
			error!("Failed to write operation queue: {}", e);
		}
	}
}

fn generate_id(now: i64) -> String {
	let mut suffix = [0u8; 6];
	rand::rng().fill(&mut suffix);
	format!("tx_{}_{}", now, hex::encode(suffix))
}
