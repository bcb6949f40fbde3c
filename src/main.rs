use rand::Rng;
use serde_json::json;
use stake_offline_sync::{
	CleanupScheduler, ExecutionOutcome, FileStore, LedgerExecutor, OfflineFacade,
	OfflineSyncError, OperationKind, Payload, StakingSnapshot, SyncConfig, SyncOrchestrator,
	SystemClock,
	sync::{LoggingEventHandler, StaticProbe},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Stand-in for the remote ledger: answers after a short delay and fails at random.
struct SimulatedLedger;

impl SimulatedLedger {
	async fn respond(&self, success_rate: f64, failure: &str) -> ExecutionOutcome {
		tokio::time::sleep(Duration::from_millis(300)).await;
		if rand::rng().random_bool(success_rate) {
			ExecutionOutcome::success()
		} else {
			ExecutionOutcome::failure(failure)
		}
	}
}

#[async_trait::async_trait]
impl LedgerExecutor for SimulatedLedger {
	async fn stake(&self, amount: &str, address: &str) -> ExecutionOutcome {
		info!("Submitting stake of {} for {}", amount, address);
		self.respond(0.9, "Stake transaction failed").await
	}

	async fn unstake(&self, amount: &str, address: &str) -> ExecutionOutcome {
		info!("Submitting unstake of {} for {}", amount, address);
		self.respond(0.85, "Unstake transaction failed").await
	}

	async fn claim(&self, address: &str) -> ExecutionOutcome {
		info!("Submitting reward claim for {}", address);
		self.respond(0.95, "Claim transaction failed").await
	}
}

fn payload(value: serde_json::Value) -> Result<Payload, OfflineSyncError> {
	Ok(serde_json::from_value(value)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	if let Err(e) = run().await {
		error!("Offline sync demo failed: {}", e);
		std::process::exit(1);
	}
}

async fn run() -> Result<(), OfflineSyncError> {
	info!("Starting offline staking client");

	let data_dir =
		std::env::var("STAKE_SYNC_DATA_DIR").unwrap_or_else(|_| "offline-data".to_string());
	let store = Arc::new(FileStore::open(data_dir)?);
	let config = SyncConfig::default();

	// Start disconnected
	let facade = Arc::new(OfflineFacade::new(
		store,
		Arc::new(SystemClock),
		&StaticProbe(false),
		config.clone(),
	));

	let address = "0x8f3a9c0d2b41e7";
	facade.save_snapshot(StakingSnapshot::new(address, "1500", "42.5"));
	if let Some(snapshot) = facade.snapshot() {
		info!(
			"Serving cached position: {} staked, {} rewards",
			snapshot.staked_amount, snapshot.rewards
		);
	}

	facade.enqueue(
		OperationKind::Stake,
		payload(json!({"amount": "250", "address": address}))?,
	);
	facade.enqueue(
		OperationKind::Unstake,
		payload(json!({"amount": "100", "address": address}))?,
	);
	facade.enqueue(OperationKind::Claim, payload(json!({"address": address}))?);
	info!(
		"Queued {} operations while offline",
		facade.pending_operations().len()
	);

	let orchestrator = Arc::new(
		SyncOrchestrator::new(
			facade.queue(),
			Arc::new(SimulatedLedger),
			facade.connectivity(),
			config.clone(),
		)
		.with_handler(Box::new(LoggingEventHandler)),
	);
	let cleanup = CleanupScheduler::new(facade.clone());

	cleanup.start()?;
	orchestrator.start()?;

	tokio::time::sleep(Duration::from_secs(1)).await;
	facade.connectivity().report(true);
	tokio::time::sleep(config.reconnect_grace + Duration::from_secs(2)).await;

	// Failed operations stay queued; retry them explicitly instead of waiting for the timer
	for _ in 0..config.max_retries {
		if facade.pending_operations().is_empty() {
			break;
		}
		orchestrator.request_sync()?;
		tokio::time::sleep(Duration::from_secs(2)).await;
	}

	orchestrator.stop().await?;
	cleanup.stop().await?;

	let stats = orchestrator.stats();
	info!(
		"Sync finished after {} episodes: {} synced, {} retried, {} abandoned, {} still queued",
		stats.episodes,
		stats.synced,
		stats.retried,
		stats.abandoned,
		facade.pending_operations().len()
	);
	Ok(())
}
