use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque, kind-specific operation payload (e.g. `{amount, address}`).
pub type Payload = BTreeMap<String, serde_json::Value>;

/// One staking position inside a cached snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEntry {
	pub amount: String,
	/// Position start time, epoch milliseconds.
	pub staking_time: i64,
	pub rewards: String,
}

/// Cached view of a user's staking position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingSnapshot {
	/// Owner address.
	pub address: String,
	/// Staked amount as a decimal string.
	pub staked_amount: String,
	/// Pending rewards as a decimal string.
	pub rewards: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub staking_position: Option<Vec<PositionEntry>>,
	/// Epoch milliseconds; stamped by the cache on every save.
	#[serde(default)]
	pub last_updated: i64,
}

impl StakingSnapshot {
	pub fn new(
		address: impl Into<String>,
		staked_amount: impl Into<String>,
		rewards: impl Into<String>,
	) -> Self {
		Self {
			address: address.into(),
			staked_amount: staked_amount.into(),
			rewards: rewards.into(),
			staking_position: None,
			last_updated: 0,
		}
	}

	pub fn with_positions(mut self, positions: Vec<PositionEntry>) -> Self {
		self.staking_position = Some(positions);
		self
	}
}

/// The kind of a state-changing staking operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
	Stake,
	Unstake,
	Claim,
}

impl OperationKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			OperationKind::Stake => "stake",
			OperationKind::Unstake => "unstake",
			OperationKind::Claim => "claim",
		}
	}
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A pending operation waiting to be replayed against the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
	/// Unique for the lifetime of the durable medium.
	pub id: String,
	#[serde(rename = "type")]
	pub kind: OperationKind,
	#[serde(rename = "data")]
	pub payload: Payload,
	/// Enqueue time, epoch milliseconds.
	pub timestamp: i64,
	pub retry_count: u32,
}

/// Last recorded connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineStatus {
	pub is_offline: bool,
	/// Time of the last transition, epoch milliseconds.
	pub timestamp: i64,
}

/// Error types for the offline queue and sync engine
#[derive(Debug, thiserror::Error)]
pub enum OfflineSyncError {
	#[error("Storage error: {0}")]
	Storage(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Invalid payload for {kind} operation: missing field `{field}`")]
	InvalidPayload { kind: OperationKind, field: String },

	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("Event channel closed")]
	ChannelClosed,

	#[error("Sync orchestrator is already running")]
	AlreadyRunning,

	#[error("Sync orchestrator is not running")]
	NotRunning,
}
