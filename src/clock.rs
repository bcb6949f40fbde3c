//! Wall-clock abstraction used for record timestamps and age checks.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time as epoch milliseconds.
pub trait Clock: Send + Sync {
	fn now_millis(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_millis(&self) -> i64 {
		chrono::Utc::now().timestamp_millis()
	}
}

/// Manually driven clock, for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
	now: AtomicI64,
}

impl ManualClock {
	pub fn new(now_millis: i64) -> Self {
		Self {
			now: AtomicI64::new(now_millis),
		}
	}

	pub fn set(&self, now_millis: i64) {
		self.now.store(now_millis, Ordering::SeqCst);
	}

	pub fn advance(&self, millis: i64) {
		self.now.fetch_add(millis, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_millis(&self) -> i64 {
		self.now.load(Ordering::SeqCst)
	}
}
