use crate::offline::{OfflineSyncError, OperationKind, Payload, QueuedOperation};
use tracing::{debug, error};

/// Fallback description for failures the executor did not explain.
pub const UNKNOWN_ERROR: &str = "Unknown sync error";

/// Outcome of one remote execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
	pub success: bool,
	pub error: Option<String>,
}

impl ExecutionOutcome {
	pub fn success() -> Self {
		Self {
			success: true,
			error: None,
		}
	}

	pub fn failure(error: impl Into<String>) -> Self {
		Self {
			success: false,
			error: Some(error.into()),
		}
	}

	/// Error description, falling back to a generic message.
	pub fn error_message(&self) -> String {
		self.error
			.clone()
			.unwrap_or_else(|| UNKNOWN_ERROR.to_string())
	}
}

/// Performs staking operations against the remote ledger.
///
/// The orchestrator places no timeout around these calls; implementations own their timeout and
/// idempotency policy.
#[async_trait::async_trait]
pub trait LedgerExecutor: Send + Sync {
	async fn stake(&self, amount: &str, address: &str) -> ExecutionOutcome;

	async fn unstake(&self, amount: &str, address: &str) -> ExecutionOutcome;

	async fn claim(&self, address: &str) -> ExecutionOutcome;
}

/// A queued operation with its payload validated for its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerRequest {
	Stake { amount: String, address: String },
	Unstake { amount: String, address: String },
	Claim { address: String },
}

impl LedgerRequest {
	/// Parse a queued operation into a request, checking every field its kind requires.
	pub fn from_operation(operation: &QueuedOperation) -> Result<Self, OfflineSyncError> {
		let kind = operation.kind;
		let payload = &operation.payload;

		let request = match kind {
			OperationKind::Stake => LedgerRequest::Stake {
				amount: required_field(kind, payload, "amount")?,
				address: required_field(kind, payload, "address")?,
			},
			OperationKind::Unstake => LedgerRequest::Unstake {
				amount: required_field(kind, payload, "amount")?,
				address: required_field(kind, payload, "address")?,
			},
			OperationKind::Claim => LedgerRequest::Claim {
				address: required_field(kind, payload, "address")?,
			},
		};
		Ok(request)
	}

	pub fn kind(&self) -> OperationKind {
		match self {
			LedgerRequest::Stake { .. } => OperationKind::Stake,
			LedgerRequest::Unstake { .. } => OperationKind::Unstake,
			LedgerRequest::Claim { .. } => OperationKind::Claim,
		}
	}

	/// Dispatch the request to the executor handler matching its kind.
	pub async fn execute(&self, executor: &dyn LedgerExecutor) -> ExecutionOutcome {
		match self {
			LedgerRequest::Stake { amount, address } => {
				debug!("Executing stake of {} for {}", amount, address);
				executor.stake(amount, address).await
			}
			LedgerRequest::Unstake { amount, address } => {
				debug!("Executing unstake of {} for {}", amount, address);
				executor.unstake(amount, address).await
			}
			LedgerRequest::Claim { address } => {
				debug!("Executing claim for {}", address);
				executor.claim(address).await
			}
		}
	}
}

/// Strings are taken as-is and numbers are rendered in decimal; anything else counts as missing.
fn required_field(
	kind: OperationKind,
	payload: &Payload,
	field: &str,
) -> Result<String, OfflineSyncError> {
	let value = match payload.get(field) {
		Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
		Some(serde_json::Value::Number(n)) => Some(n.to_string()),
		_ => None,
	};

	value.ok_or_else(|| {
		error!("[PARSE_OPERATION] {} payload is missing `{}`", kind, field);
		OfflineSyncError::InvalidPayload {
			kind,
			field: field.to_string(),
		}
	})
}
