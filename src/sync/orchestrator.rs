//! Background sync orchestrator.
//!
//! This module defines the `SyncOrchestrator`, which drains the offline operation queue through
//! the ledger executor whenever a trigger fires and the network is reachable.
//!
//! The orchestrator is responsible for:
//! - Enforcing single-flight: at most one episode runs at a time, triggers arriving meanwhile are dropped
//! - Draining a snapshot of the queue strictly in order, one operation at a time
//! - Applying the retry/abandon policy through the queue's contract
//! - Emitting lifecycle events for every outcome
//! - Owning the trigger sources (reconnect edge, periodic timer, startup check, explicit requests)
//!   as subscriptions that `stop()` cancels deterministically
//!
//! An episode in flight is never cancelled: `stop()` waits for it to drain its snapshot.

use crate::config::SyncConfig;
use crate::offline::{FailureOutcome, OfflineSyncError, OperationQueue, QueuedOperation};
use crate::sync::{
    connectivity::{ConnectivityMonitor, SyncTrigger},
    events::{EventDispatcher, LifecycleEvent, LifecycleEventHandler},
    executor::{LedgerExecutor, LedgerRequest},
    progress_tracker::{EpisodeStats, EpisodeTracker, OrchestratorStats},
};

use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

/// Resets the state to `Idle` when an episode ends, even by panic.
struct EpisodeGuard<'a> {
    state: &'a watch::Sender<SyncState>,
}

impl Drop for EpisodeGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(SyncState::Idle);
    }
}

/// Handles of the running background task.
struct BackgroundTask {
    shutdown: watch::Sender<bool>,
    requests: mpsc::UnboundedSender<()>,
    handle: JoinHandle<()>,
}

/// Drains the offline operation queue against the ledger.
///
/// Construct it once in the application's composition root, register event handlers, then call
/// `start()`. Episodes can also be run directly with `sync_now()`, which goes through the same
/// single-flight guard.
pub struct SyncOrchestrator {
    queue: Arc<OperationQueue>,
    executor: Arc<dyn LedgerExecutor>,
    connectivity: ConnectivityMonitor,
    dispatcher: AsyncMutex<EventDispatcher>,
    config: SyncConfig,
    state: watch::Sender<SyncState>,
    stats: parking_lot::Mutex<OrchestratorStats>,
    background: parking_lot::Mutex<Option<BackgroundTask>>,
}

impl SyncOrchestrator {
    pub fn new(
        queue: Arc<OperationQueue>,
        executor: Arc<dyn LedgerExecutor>,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            queue,
            executor,
            connectivity,
            dispatcher: AsyncMutex::new(EventDispatcher::new()),
            config,
            state,
            stats: parking_lot::Mutex::new(OrchestratorStats::default()),
            background: parking_lot::Mutex::new(None),
        }
    }

    /// Register an event handler before the orchestrator is shared.
    pub fn with_handler(mut self, handler: Box<dyn LifecycleEventHandler>) -> Self {
        self.dispatcher.get_mut().register_handler(handler);
        self
    }

    /// Register an event handler.
    pub async fn register_handler(&self, handler: Box<dyn LifecycleEventHandler>) {
        self.dispatcher.lock().await.register_handler(handler);
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Subscribe to `Idle`/`Syncing` transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.stats.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.background.lock().is_some()
    }

    /// Run one episode if the network is reachable and no episode is in flight.
    ///
    /// Returns `None` when the trigger was dropped.
    pub async fn sync_now(&self, trigger: SyncTrigger) -> Option<EpisodeStats> {
        if !self.connectivity.is_reachable() {
            debug!("Network unreachable, skipping {} sync", trigger);
            self.stats.lock().offline_triggers += 1;
            return None;
        }

        let acquired = self.state.send_if_modified(|state| {
            if *state != SyncState::Idle {
                return false;
            }
            *state = SyncState::Syncing;
            true
        });
        if !acquired {
            debug!("Sync already in progress, dropping {} trigger", trigger);
            self.stats.lock().dropped_triggers += 1;
            return None;
        }

        let _guard = EpisodeGuard { state: &self.state };
        Some(self.drain(trigger).await)
    }

    /// Drain the queue snapshot taken at episode start.
    async fn drain(&self, trigger: SyncTrigger) -> EpisodeStats {
        let pending = self.queue.read_all();
        info!(
            "Starting background sync ({} trigger): {} operations to sync",
            trigger,
            pending.len()
        );

        let mut tracker = EpisodeTracker::new(trigger, pending.len());
        for operation in &pending {
            self.process_operation(operation, &mut tracker).await;
        }

        let stats = tracker.finish();
        self.stats.lock().record_episode(&stats);
        self.emit(LifecycleEvent::EpisodeCompleted {
            trigger,
            processed: stats.processed(),
            synced: stats.synced.len(),
            retried: stats.retried.len(),
            abandoned: stats.abandoned.len(),
        })
        .await;
        stats
    }

    async fn process_operation(&self, operation: &QueuedOperation, tracker: &mut EpisodeTracker) {
        let request = match LedgerRequest::from_operation(operation) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    "Operation {} cannot be executed, abandoning: {}",
                    operation.id, e
                );
                match self.queue.take(&operation.id) {
                    Some(removed) => {
                        tracker.record_abandoned(&removed.id);
                        self.emit(LifecycleEvent::Abandoned {
                            operation_id: removed.id,
                            attempts: removed.retry_count + 1,
                            error: e.to_string(),
                        })
                        .await;
                    }
                    None => tracker.record_vanished(&operation.id),
                }
                return;
            }
        };

        let outcome = request.execute(self.executor.as_ref()).await;

        if outcome.success {
            self.queue.remove(&operation.id);
            tracker.record_synced(&operation.id);
            self.emit(LifecycleEvent::Synced {
                operation_id: operation.id.clone(),
            })
            .await;
            return;
        }

        let error = outcome.error_message();
        error!("Failed to sync operation {}: {}", operation.id, error);

        match self
            .queue
            .record_failure(&operation.id, self.config.max_retries)
        {
            FailureOutcome::Retrying(attempt) => {
                tracker.record_retried(&operation.id);
                self.emit(LifecycleEvent::Retrying {
                    operation_id: operation.id.clone(),
                    attempt,
                    error,
                })
                .await;
            }
            FailureOutcome::Abandoned(attempts) => {
                info!(
                    "Operation {} exceeded max retries, removing from queue",
                    operation.id
                );
                tracker.record_abandoned(&operation.id);
                self.emit(LifecycleEvent::Abandoned {
                    operation_id: operation.id.clone(),
                    attempts,
                    error,
                })
                .await;
            }
            FailureOutcome::Missing => tracker.record_vanished(&operation.id),
        }
    }

    async fn emit(&self, event: LifecycleEvent) {
        self.dispatcher.lock().await.dispatch(&event).await;
    }

    /// Start listening for sync triggers in a background task.
    pub fn start(self: &Arc<Self>) -> Result<(), OfflineSyncError> {
        let mut background = self.background.lock();
        if background.is_some() {
            return Err(OfflineSyncError::AlreadyRunning);
        }
        self.config.validate()?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (requests, requests_rx) = mpsc::unbounded_channel();
        // Subscribe before spawning so no transition reported after start() is missed
        let reachability = self.connectivity.subscribe();

        let handle = tokio::spawn(Arc::clone(self).run(shutdown_rx, requests_rx, reachability));
        *background = Some(BackgroundTask {
            shutdown,
            requests,
            handle,
        });

        info!("Background sync started");
        Ok(())
    }

    /// Cancel all trigger sources and wait for any in-flight episode to finish.
    pub async fn stop(&self) -> Result<(), OfflineSyncError> {
        let task = self
            .background
            .lock()
            .take()
            .ok_or(OfflineSyncError::NotRunning)?;

        let _ = task.shutdown.send(true);
        if let Err(e) = task.handle.await {
            error!("Background sync task failed: {}", e);
        }

        info!("Background sync stopped");
        Ok(())
    }

    /// Request a sync, e.g. after the user performed a reconnect action.
    pub fn request_sync(&self) -> Result<(), OfflineSyncError> {
        let background = self.background.lock();
        let task = background.as_ref().ok_or(OfflineSyncError::NotRunning)?;
        task.requests
            .send(())
            .map_err(|_| OfflineSyncError::NotRunning)
    }

    async fn run(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        mut requests: mpsc::UnboundedReceiver<()>,
        mut reachability: watch::Receiver<bool>,
    ) {
        let started = Instant::now();
        let mut periodic = time::interval_at(
            started + self.config.sync_interval,
            self.config.sync_interval,
        );
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut startup_at = Some(started + self.config.startup_delay);
        let mut reconnect_at: Option<Instant> = None;
        let mut episodes = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                changed = reachability.changed() => {
                    if changed.is_err() {
                        warn!("Connectivity monitor dropped, stopping background sync");
                        break;
                    }
                    let reachable = *reachability.borrow_and_update();
                    self.emit(LifecycleEvent::ConnectivityChanged { reachable }).await;
                    reconnect_at = reachable.then(|| Instant::now() + self.config.reconnect_grace);
                }
                _ = time::sleep_until(reconnect_at.unwrap_or(started)), if reconnect_at.is_some() => {
                    reconnect_at = None;
                    info!("Connection restored, triggering background sync");
                    self.spawn_episode(&mut episodes, SyncTrigger::Reconnected);
                }
                _ = time::sleep_until(startup_at.unwrap_or(started)), if startup_at.is_some() => {
                    startup_at = None;
                    self.spawn_episode(&mut episodes, SyncTrigger::Startup);
                }
                _ = periodic.tick() => {
                    self.spawn_episode(&mut episodes, SyncTrigger::Periodic);
                }
                Some(()) = requests.recv() => {
                    self.spawn_episode(&mut episodes, SyncTrigger::Requested);
                }
                Some(joined) = episodes.join_next() => {
                    if let Err(e) = joined {
                        error!("Sync episode task failed: {}", e);
                    }
                }
            }
        }

        // Episodes are never cancelled; let the in-flight one drain its snapshot
        while let Some(joined) = episodes.join_next().await {
            if let Err(e) = joined {
                error!("Sync episode task failed: {}", e);
            }
        }
    }

    fn spawn_episode(self: &Arc<Self>, episodes: &mut JoinSet<()>, trigger: SyncTrigger) {
        if self.state() == SyncState::Syncing {
            debug!("Sync already in progress, dropping {} trigger", trigger);
            self.stats.lock().dropped_triggers += 1;
            return;
        }

        let orchestrator = Arc::clone(self);
        episodes.spawn(async move {
            orchestrator.sync_now(trigger).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::offline::{OperationKind, Payload};
    use crate::storage::InMemoryStore;
    use crate::sync::connectivity::StaticProbe;
    use crate::sync::events::ChannelEventHandler;
    use crate::sync::executor::ExecutionOutcome;
    use crate::sync::testing::ScriptedExecutor;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::{Semaphore, mpsc::UnboundedReceiver};

    struct Harness {
        orchestrator: Arc<SyncOrchestrator>,
        queue: Arc<OperationQueue>,
        executor: Arc<ScriptedExecutor>,
        monitor: ConnectivityMonitor,
        events: UnboundedReceiver<LifecycleEvent>,
    }

    fn test_config() -> SyncConfig {
        SyncConfig::default().with_startup_delay(Duration::from_secs(3600))
    }

    fn harness(executor: ScriptedExecutor, reachable: bool, config: SyncConfig) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let queue = Arc::new(OperationQueue::new(store, clock, "queue"));
        let executor = Arc::new(executor);
        let monitor = ConnectivityMonitor::new(&StaticProbe(reachable));
        let (channel, events) = ChannelEventHandler::new();

        let orchestrator = SyncOrchestrator::new(
            queue.clone(),
            executor.clone(),
            monitor.clone(),
            config,
        )
        .with_handler(Box::new(channel));

        Harness {
            orchestrator: Arc::new(orchestrator),
            queue,
            executor,
            monitor,
            events,
        }
    }

    fn payload(value: serde_json::Value) -> Payload {
        serde_json::from_value(value).unwrap()
    }

    /// Drains received events, leaving out episode summaries.
    fn operation_events(events: &mut UnboundedReceiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            if !matches!(event, LifecycleEvent::EpisodeCompleted { .. }) {
                received.push(event);
            }
        }
        received
    }

    #[tokio::test]
    async fn test_stake_fails_twice_then_syncs() {
        let mut h = harness(
            ScriptedExecutor::new([
                ExecutionOutcome::failure("nonce too low"),
                ExecutionOutcome::failure("timeout"),
                ExecutionOutcome::success(),
            ]),
            true,
            test_config(),
        );
        let id = h.queue.enqueue(
            OperationKind::Stake,
            payload(json!({"amount": "100", "address": "0xA"})),
        );

        h.orchestrator.sync_now(SyncTrigger::Periodic).await.unwrap();
        assert_eq!(
            operation_events(&mut h.events),
            vec![LifecycleEvent::Retrying {
                operation_id: id.clone(),
                attempt: 1,
                error: "nonce too low".to_string()
            }]
        );
        assert_eq!(h.queue.get(&id).unwrap().retry_count, 1);

        h.orchestrator.sync_now(SyncTrigger::Periodic).await.unwrap();
        assert_eq!(
            operation_events(&mut h.events),
            vec![LifecycleEvent::Retrying {
                operation_id: id.clone(),
                attempt: 2,
                error: "timeout".to_string()
            }]
        );

        h.orchestrator.sync_now(SyncTrigger::Periodic).await.unwrap();
        assert_eq!(
            operation_events(&mut h.events),
            vec![LifecycleEvent::Synced {
                operation_id: id.clone()
            }]
        );
        assert!(h.queue.is_empty());
        assert_eq!(
            h.executor.calls(),
            vec![
                LedgerRequest::Stake {
                    amount: "100".to_string(),
                    address: "0xA".to_string()
                };
                3
            ]
        );
        assert_eq!(h.orchestrator.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_claim_abandoned_after_max_retries() {
        let mut h = harness(
            ScriptedExecutor::new(vec![ExecutionOutcome::failure("reverted"); 3]),
            true,
            test_config(),
        );
        let id = h
            .queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));

        for _ in 0..3 {
            h.orchestrator.sync_now(SyncTrigger::Requested).await.unwrap();
        }

        let expected = vec![
            LifecycleEvent::Retrying {
                operation_id: id.clone(),
                attempt: 1,
                error: "reverted".to_string(),
            },
            LifecycleEvent::Retrying {
                operation_id: id.clone(),
                attempt: 2,
                error: "reverted".to_string(),
            },
            LifecycleEvent::Abandoned {
                operation_id: id.clone(),
                attempts: 3,
                error: "reverted".to_string(),
            },
        ];
        assert_eq!(operation_events(&mut h.events), expected);
        assert!(h.queue.is_empty());

        let stats = h.orchestrator.stats();
        assert_eq!(stats.episodes, 3);
        assert_eq!(stats.retried, 2);
        assert_eq!(stats.abandoned, 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_episode_or_reorder() {
        let mut h = harness(
            ScriptedExecutor::new([
                ExecutionOutcome::success(),
                ExecutionOutcome {
                    success: false,
                    error: None,
                },
                ExecutionOutcome::success(),
            ]),
            true,
            test_config(),
        );
        let first = h.queue.enqueue(
            OperationKind::Stake,
            payload(json!({"amount": "1", "address": "0xA"})),
        );
        let second = h.queue.enqueue(
            OperationKind::Unstake,
            payload(json!({"amount": "2", "address": "0xA"})),
        );
        let third = h
            .queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));

        let stats = h.orchestrator.sync_now(SyncTrigger::Periodic).await.unwrap();
        assert_eq!(stats.synced, vec![first.clone(), third.clone()]);
        assert_eq!(stats.retried, vec![second.clone()]);

        let kinds: Vec<OperationKind> = h.executor.calls().iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::Stake,
                OperationKind::Unstake,
                OperationKind::Claim
            ]
        );
        assert_eq!(
            operation_events(&mut h.events)[1],
            LifecycleEvent::Retrying {
                operation_id: second.clone(),
                attempt: 1,
                error: crate::sync::executor::UNKNOWN_ERROR.to_string()
            }
        );

        let remaining = h.queue.read_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_abandoned_without_execution() {
        let mut h = harness(ScriptedExecutor::default(), true, test_config());
        let id = h
            .queue
            .enqueue(OperationKind::Stake, payload(json!({"address": "0xA"})));

        let stats = h.orchestrator.sync_now(SyncTrigger::Periodic).await.unwrap();
        assert_eq!(stats.abandoned, vec![id.clone()]);
        assert!(h.executor.calls().is_empty());
        assert!(h.queue.is_empty());

        match operation_events(&mut h.events).as_slice() {
            [LifecycleEvent::Abandoned {
                operation_id,
                attempts,
                error,
            }] => {
                assert_eq!(operation_id, &id);
                assert_eq!(*attempts, 1);
                assert!(error.contains("amount"));
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_trigger_is_skipped() {
        let h = harness(ScriptedExecutor::default(), false, test_config());
        h.queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));

        assert!(h.orchestrator.sync_now(SyncTrigger::Periodic).await.is_none());
        assert!(h.executor.calls().is_empty());
        assert_eq!(h.queue.len(), 1);
        assert_eq!(h.orchestrator.stats().offline_triggers, 1);
    }

    #[tokio::test]
    async fn test_trigger_while_syncing_is_dropped() {
        let gate = Arc::new(Semaphore::new(0));
        let executor = ScriptedExecutor::default().gated(gate.clone());
        let entered = executor.entered();
        let h = harness(executor, true, test_config());
        let first = h.queue.enqueue(
            OperationKind::Stake,
            payload(json!({"amount": "100", "address": "0xA"})),
        );

        let orchestrator = h.orchestrator.clone();
        let episode =
            tokio::spawn(async move { orchestrator.sync_now(SyncTrigger::Periodic).await });
        entered.notified().await;
        assert_eq!(h.orchestrator.state(), SyncState::Syncing);

        // Enqueued mid-episode: left for the next episode
        let late = h
            .queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));
        assert!(h.orchestrator.sync_now(SyncTrigger::Requested).await.is_none());

        gate.add_permits(1);
        let stats = episode.await.unwrap().unwrap();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.synced, vec![first]);
        assert_eq!(h.executor.calls().len(), 1);
        assert_eq!(h.orchestrator.state(), SyncState::Idle);
        assert_eq!(h.orchestrator.stats().dropped_triggers, 1);

        let remaining: Vec<String> = h.queue.read_all().into_iter().map(|op| op.id).collect();
        assert_eq!(remaining, vec![late]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_runs_single_episode_in_enqueue_order() {
        let mut h = harness(ScriptedExecutor::default(), false, test_config());
        let first = h.queue.enqueue(
            OperationKind::Stake,
            payload(json!({"amount": "100", "address": "0xA"})),
        );
        let second = h
            .queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));

        h.orchestrator.start().unwrap();
        h.monitor.report(true);

        // Still inside the grace period
        time::sleep(Duration::from_millis(500)).await;
        assert!(h.executor.calls().is_empty());

        time::sleep(Duration::from_secs(2)).await;
        h.orchestrator.stop().await.unwrap();

        assert_eq!(
            h.executor.calls(),
            vec![
                LedgerRequest::Stake {
                    amount: "100".to_string(),
                    address: "0xA".to_string()
                },
                LedgerRequest::Claim {
                    address: "0xA".to_string()
                },
            ]
        );
        assert_eq!(h.orchestrator.stats().episodes, 1);
        assert!(h.queue.is_empty());
        assert_eq!(
            operation_events(&mut h.events),
            vec![
                LifecycleEvent::ConnectivityChanged { reachable: true },
                LifecycleEvent::Synced {
                    operation_id: first
                },
                LifecycleEvent::Synced {
                    operation_id: second
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_lost_during_grace_cancels_reconnect_sync() {
        let mut h = harness(ScriptedExecutor::default(), false, test_config());
        h.queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));

        h.orchestrator.start().unwrap();
        h.monitor.report(true);
        time::sleep(Duration::from_millis(400)).await;
        h.monitor.report(false);
        time::sleep(Duration::from_secs(5)).await;
        h.orchestrator.stop().await.unwrap();

        assert!(h.executor.calls().is_empty());
        assert_eq!(h.queue.len(), 1);
        assert_eq!(
            operation_events(&mut h.events),
            vec![
                LifecycleEvent::ConnectivityChanged { reachable: true },
                LifecycleEvent::ConnectivityChanged { reachable: false },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_and_startup_triggers() {
        let config = SyncConfig::default()
            .with_startup_delay(Duration::from_secs(2))
            .with_sync_interval(Duration::from_secs(300));
        let h = harness(ScriptedExecutor::default(), true, config);

        h.orchestrator.start().unwrap();
        time::sleep(Duration::from_secs(3)).await;
        let after_startup = h.orchestrator.stats();
        assert_eq!(after_startup.episodes, 1);
        assert_eq!(
            after_startup.last_episode.unwrap().trigger,
            SyncTrigger::Startup
        );

        h.queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));
        time::sleep(Duration::from_secs(300)).await;
        h.orchestrator.stop().await.unwrap();

        let stats = h.orchestrator.stats();
        assert_eq!(stats.episodes, 2);
        assert_eq!(stats.synced, 1);
        assert_eq!(stats.last_episode.unwrap().trigger, SyncTrigger::Periodic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_sync_and_lifecycle_errors() {
        let h = harness(ScriptedExecutor::default(), true, test_config());
        assert!(matches!(
            h.orchestrator.request_sync(),
            Err(OfflineSyncError::NotRunning)
        ));
        assert!(matches!(
            h.orchestrator.stop().await,
            Err(OfflineSyncError::NotRunning)
        ));

        h.orchestrator.start().unwrap();
        assert!(h.orchestrator.is_running());
        assert!(matches!(
            h.orchestrator.start(),
            Err(OfflineSyncError::AlreadyRunning)
        ));

        h.queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));
        h.orchestrator.request_sync().unwrap();
        time::sleep(Duration::from_millis(10)).await;
        assert!(h.queue.is_empty());
        assert_eq!(
            h.orchestrator.stats().last_episode.unwrap().trigger,
            SyncTrigger::Requested
        );

        h.orchestrator.stop().await.unwrap();
        assert!(!h.orchestrator.is_running());

        // Stopped: timers no longer fire
        h.queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));
        time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(h.queue.len(), 1);

        // Restartable
        h.orchestrator.start().unwrap();
        h.orchestrator.request_sync().unwrap();
        time::sleep(Duration::from_millis(10)).await;
        h.orchestrator.stop().await.unwrap();
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_start_rejects_zero_sync_interval() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"sync_interval": {"secs": 0, "nanos": 0}}"#).unwrap();
        let h = harness(ScriptedExecutor::default(), true, config);

        assert!(matches!(
            h.orchestrator.start(),
            Err(OfflineSyncError::InvalidConfig(_))
        ));
        assert!(!h.orchestrator.is_running());
        assert!(matches!(
            h.orchestrator.request_sync(),
            Err(OfflineSyncError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_failed_operation_removed_mid_call_emits_nothing() {
        let gate = Arc::new(Semaphore::new(0));
        let executor = ScriptedExecutor::new([ExecutionOutcome::failure("timeout")])
            .gated(gate.clone());
        let entered = executor.entered();
        let mut h = harness(executor, true, test_config());
        let id = h
            .queue
            .enqueue(OperationKind::Claim, payload(json!({"address": "0xA"})));

        let orchestrator = h.orchestrator.clone();
        let episode =
            tokio::spawn(async move { orchestrator.sync_now(SyncTrigger::Periodic).await });
        entered.notified().await;
        h.queue.remove(&id);
        gate.add_permits(1);

        let stats = episode.await.unwrap().unwrap();
        assert_eq!(stats.vanished, 1);
        assert_eq!(stats.processed(), 1);
        assert!(stats.retried.is_empty());
        assert!(stats.abandoned.is_empty());
        assert!(operation_events(&mut h.events).is_empty());
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_successful_operation_cleared_mid_call_still_syncs() {
        let gate = Arc::new(Semaphore::new(0));
        let executor = ScriptedExecutor::default().gated(gate.clone());
        let entered = executor.entered();
        let mut h = harness(executor, true, test_config());
        let id = h.queue.enqueue(
            OperationKind::Stake,
            payload(json!({"amount": "100", "address": "0xA"})),
        );

        let orchestrator = h.orchestrator.clone();
        let episode =
            tokio::spawn(async move { orchestrator.sync_now(SyncTrigger::Periodic).await });
        entered.notified().await;
        h.queue.clear();
        gate.add_permits(1);

        let stats = episode.await.unwrap().unwrap();
        assert_eq!(stats.synced, vec![id.clone()]);
        assert_eq!(stats.vanished, 0);
        assert_eq!(
            operation_events(&mut h.events),
            vec![LifecycleEvent::Synced { operation_id: id }]
        );
        assert!(h.queue.is_empty());
    }
}
