//! Lifecycle event system for background synchronization.
//!
//! This module defines the lifecycle events emitted by the sync orchestrator, the handler trait
//! consumers implement, and the dispatcher that fans each event out to every registered handler.
//! The orchestrator never renders anything itself: presentation code observes outcomes purely
//! through these events.
//!
//! For every operation that leaves the queue through a sync episode, exactly one of `Synced` or
//! `Abandoned` is emitted, possibly preceded by any number of `Retrying` events in earlier episodes.

use crate::offline::OfflineSyncError;
use crate::sync::connectivity::SyncTrigger;
use serde::Serialize;
use tokio::sync::mpsc;

/// Events observable by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LifecycleEvent {
    /// The operation was executed and removed from the queue
    Synced { operation_id: String },
    /// The operation failed and stays queued for the next episode
    Retrying {
        operation_id: String,
        attempt: u32,
        error: String,
    },
    /// The operation exhausted its retries and was dropped from the queue
    Abandoned {
        operation_id: String,
        attempts: u32,
        error: String,
    },
    /// Reachability changed
    ConnectivityChanged { reachable: bool },
    /// A sync episode drained its snapshot of the queue
    EpisodeCompleted {
        #[serde(skip)]
        trigger: SyncTrigger,
        processed: usize,
        synced: usize,
        retried: usize,
        abandoned: usize,
    },
}

impl LifecycleEvent {
    /// Identifier of the operation the event refers to, if any.
    pub fn operation_id(&self) -> Option<&str> {
        match self {
            LifecycleEvent::Synced { operation_id }
            | LifecycleEvent::Retrying { operation_id, .. }
            | LifecycleEvent::Abandoned { operation_id, .. } => Some(operation_id),
            _ => None,
        }
    }
}

/// Trait for handling lifecycle events.
#[async_trait::async_trait]
pub trait LifecycleEventHandler: Send + Sync {
    /// Handle a lifecycle event.
    ///
    /// Called for every event dispatched by the orchestrator, in emission order.
    async fn handle(&mut self, event: &LifecycleEvent) -> Result<(), OfflineSyncError>;

    /// Get the name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
///
/// Handlers are independent: a failing handler is logged and the others still run.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Box<dyn LifecycleEventHandler>>,
}

impl EventDispatcher {
    /// Create a new, empty event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new event handler.
    ///
    /// Handlers are called in the order they are registered.
    pub fn register_handler(&mut self, handler: Box<dyn LifecycleEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatch an event to all registered handlers.
    pub async fn dispatch(&mut self, event: &LifecycleEvent) {
        for handler in &mut self.handlers {
            if let Err(e) = handler.handle(event).await {
                tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
            }
        }
    }
}

/// Forwards events into an unbounded channel.
pub struct ChannelEventHandler {
    sender: mpsc::UnboundedSender<LifecycleEvent>,
}

impl ChannelEventHandler {
    /// Creates the handler together with the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait::async_trait]
impl LifecycleEventHandler for ChannelEventHandler {
    async fn handle(&mut self, event: &LifecycleEvent) -> Result<(), OfflineSyncError> {
        self.sender
            .send(event.clone())
            .map_err(|_| OfflineSyncError::ChannelClosed)
    }

    fn name(&self) -> &'static str {
        "ChannelEventHandler"
    }
}

/// Writes every event to the log.
#[derive(Debug, Default)]
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl LifecycleEventHandler for LoggingEventHandler {
    async fn handle(&mut self, event: &LifecycleEvent) -> Result<(), OfflineSyncError> {
        match event {
            LifecycleEvent::Synced { operation_id } => {
                tracing::info!("Operation {} synced successfully", operation_id)
            }
            LifecycleEvent::Retrying {
                operation_id,
                attempt,
                error,
            } => tracing::warn!(
                "Operation {} failed (attempt {}), will retry: {}",
                operation_id,
                attempt,
                error
            ),
            LifecycleEvent::Abandoned {
                operation_id,
                attempts,
                error,
            } => tracing::error!(
                "Operation {} abandoned after {} attempts: {}",
                operation_id,
                attempts,
                error
            ),
            LifecycleEvent::ConnectivityChanged { reachable } => {
                tracing::info!("Connectivity changed: reachable={}", reachable)
            }
            LifecycleEvent::EpisodeCompleted {
                trigger,
                processed,
                synced,
                retried,
                abandoned,
            } => tracing::info!(
                "Sync episode ({}) finished: {} processed, {} synced, {} retrying, {} abandoned",
                trigger,
                processed,
                synced,
                retried,
                abandoned
            ),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingEventHandler"
    }
}
