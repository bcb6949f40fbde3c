//! Connectivity monitoring.
//!
//! `ConnectivityMonitor` holds the reachable/unreachable state derived from platform signals.
//! Platform glue reports every signal through `report`; the monitor only publishes actual
//! transitions and never blocks them. The orchestrator subscribes to those transitions to raise
//! the reconnect trigger.

use crate::offline::OfflineStatusStore;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Platform source of the current reachability.
pub trait ReachabilityProbe: Send + Sync {
	fn is_reachable(&self) -> bool;
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl ReachabilityProbe for StaticProbe {
	fn is_reachable(&self) -> bool {
		self.0
	}
}

/// What caused a sync to be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTrigger {
	/// Connectivity came back (after the grace period).
	Reconnected,
	/// Periodic timer.
	Periodic,
	/// One-off check after the orchestrator starts.
	Startup,
	/// Explicit request from the presentation layer.
	Requested,
}

impl fmt::Display for SyncTrigger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			SyncTrigger::Reconnected => "reconnected",
			SyncTrigger::Periodic => "periodic",
			SyncTrigger::Startup => "startup",
			SyncTrigger::Requested => "requested",
		};
		f.write_str(name)
	}
}

/// Shared reachability state. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
	state: Arc<watch::Sender<bool>>,
	status: Option<Arc<OfflineStatusStore>>,
}

impl ConnectivityMonitor {
	/// Creates a monitor whose initial state is read from the platform probe.
	pub fn new(probe: &dyn ReachabilityProbe) -> Self {
		let (state, _) = watch::channel(probe.is_reachable());
		Self {
			state: Arc::new(state),
			status: None,
		}
	}

	/// Persists every transition (and the initial state) into `status`.
	pub fn with_status_record(mut self, status: Arc<OfflineStatusStore>) -> Self {
		status.set(!self.is_reachable());
		self.status = Some(status);
		self
	}

	pub fn is_reachable(&self) -> bool {
		*self.state.borrow()
	}

	/// Reports a platform signal. Returns whether it changed the state.
	pub fn report(&self, reachable: bool) -> bool {
		let changed = self.state.send_if_modified(|current| {
			if *current == reachable {
				return false;
			}
			*current = reachable;
			true
		});

		if changed {
			if reachable {
				info!("Connection restored");
			} else {
				info!("Connection lost, switching to offline mode");
			}
			if let Some(status) = &self.status {
				status.set(!reachable);
			}
		}
		changed
	}

	/// Subscribes to state transitions.
	pub fn subscribe(&self) -> watch::Receiver<bool> {
		self.state.subscribe()
	}
}
