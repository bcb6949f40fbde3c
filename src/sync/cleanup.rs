//! Periodic cleanup routine.
//!
//! Runs `OfflineFacade::run_cleanup` once when started and then every `cleanup_interval`, until
//! stopped.

use crate::offline::{OfflineFacade, OfflineSyncError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

pub struct CleanupScheduler {
	facade: Arc<OfflineFacade>,
	interval: Duration,
	task: parking_lot::Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl CleanupScheduler {
	pub fn new(facade: Arc<OfflineFacade>) -> Self {
		let interval = facade.config().cleanup_interval;
		Self {
			facade,
			interval,
			task: parking_lot::Mutex::new(None),
		}
	}

	pub fn start(&self) -> Result<(), OfflineSyncError> {
		let mut task = self.task.lock();
		if task.is_some() {
			return Err(OfflineSyncError::AlreadyRunning);
		}
		if self.interval.is_zero() {
			return Err(OfflineSyncError::InvalidConfig(
				"cleanup_interval must be greater than zero".to_string(),
			));
		}

		let (shutdown, mut shutdown_rx) = watch::channel(false);
		let facade = self.facade.clone();
		let interval = self.interval;

		let handle = tokio::spawn(async move {
			// First tick completes immediately
			let mut ticker = time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				tokio::select! {
					_ = shutdown_rx.changed() => break,
					_ = ticker.tick() => {
						let report = facade.run_cleanup();
						debug!("Cleanup pass finished: {:?}", report);
					}
				}
			}
		});

		*task = Some((shutdown, handle));
		info!("Cleanup routine started, running every {:?}", self.interval);
		Ok(())
	}

	pub async fn stop(&self) -> Result<(), OfflineSyncError> {
		let (shutdown, handle) = self
			.task
			.lock()
			.take()
			.ok_or(OfflineSyncError::NotRunning)?;

		let _ = shutdown.send(true);
		if let Err(e) = handle.await {
			error!("Cleanup task failed: {}", e);
		}
		info!("Cleanup routine stopped");
		Ok(())
	}
}
