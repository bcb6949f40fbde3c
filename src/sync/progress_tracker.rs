//! Progress tracking for sync episodes.
//!
//! This module provides the `EpisodeTracker`, which records the outcome of every operation
//! processed during one episode, and `OrchestratorStats`, which accumulates those outcomes over
//! the lifetime of an orchestrator.

use crate::sync::connectivity::SyncTrigger;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Tracks the outcomes of a single sync episode
#[derive(Debug, Clone)]
pub struct EpisodeTracker {
    trigger: SyncTrigger,
    /// Number of operations in the queue snapshot taken at episode start
    queued: usize,
    synced: Vec<String>,
    retried: Vec<String>,
    abandoned: Vec<String>,
    /// Operations that left the queue by other means while being executed
    vanished: usize,
    started_at: Instant,
}

impl EpisodeTracker {
    /// Create a new tracker for an episode draining `queued` operations.
    pub fn new(trigger: SyncTrigger, queued: usize) -> Self {
        Self {
            trigger,
            queued,
            synced: Vec::new(),
            retried: Vec::new(),
            abandoned: Vec::new(),
            vanished: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_synced(&mut self, operation_id: &str) {
        self.synced.push(operation_id.to_string());
    }

    pub fn record_retried(&mut self, operation_id: &str) {
        self.retried.push(operation_id.to_string());
    }

    pub fn record_abandoned(&mut self, operation_id: &str) {
        self.abandoned.push(operation_id.to_string());
    }

    pub fn record_vanished(&mut self, operation_id: &str) {
        debug!("Operation {} left the queue during execution", operation_id);
        self.vanished += 1;
    }

    /// Number of operations processed so far.
    pub fn processed(&self) -> usize {
        self.synced.len() + self.retried.len() + self.abandoned.len() + self.vanished
    }

    /// Finish the episode and return its statistics.
    pub fn finish(self) -> EpisodeStats {
        let stats = EpisodeStats {
            trigger: self.trigger,
            queued: self.queued,
            synced: self.synced,
            retried: self.retried,
            abandoned: self.abandoned,
            vanished: self.vanished,
            duration: self.started_at.elapsed(),
        };
        info!("Sync episode completed: {}", stats.summary());
        stats
    }
}

/// Statistics about one sync episode
#[derive(Debug, Clone)]
pub struct EpisodeStats {
    pub trigger: SyncTrigger,
    pub queued: usize,
    /// Ids of operations executed successfully, in processing order
    pub synced: Vec<String>,
    /// Ids of operations that failed and remain queued
    pub retried: Vec<String>,
    /// Ids of operations dropped after exhausting their retries
    pub abandoned: Vec<String>,
    pub vanished: usize,
    pub duration: Duration,
}

impl EpisodeStats {
    pub fn processed(&self) -> usize {
        self.synced.len() + self.retried.len() + self.abandoned.len() + self.vanished
    }

    /// Get a human-readable summary of the episode
    pub fn summary(&self) -> String {
        format!(
            "{} trigger: {} of {} operations processed, {} synced, {} retrying, {} abandoned in {:?}",
            self.trigger,
            self.processed(),
            self.queued,
            self.synced.len(),
            self.retried.len(),
            self.abandoned.len(),
            self.duration,
        )
    }
}

/// Cumulative statistics over an orchestrator's lifetime
#[derive(Debug, Clone, Default)]
pub struct OrchestratorStats {
    pub episodes: u64,
    pub synced: u64,
    pub retried: u64,
    pub abandoned: u64,
    /// Triggers dropped because an episode was already in flight
    pub dropped_triggers: u64,
    /// Triggers skipped because the network was unreachable
    pub offline_triggers: u64,
    pub last_episode: Option<EpisodeStats>,
}

impl OrchestratorStats {
    pub(crate) fn record_episode(&mut self, stats: &EpisodeStats) {
        self.episodes += 1;
        self.synced += stats.synced.len() as u64;
        self.retried += stats.retried.len() as u64;
        self.abandoned += stats.abandoned.len() as u64;
        self.last_episode = Some(stats.clone());
    }
}
