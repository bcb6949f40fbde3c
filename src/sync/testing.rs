use crate::sync::executor::{ExecutionOutcome, LedgerExecutor, LedgerRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

/// Executor replaying a fixed script of outcomes, succeeding once the script runs out.
#[derive(Default)]
pub(crate) struct ScriptedExecutor {
	outcomes: Mutex<VecDeque<ExecutionOutcome>>,
	calls: Mutex<Vec<LedgerRequest>>,
	gate: Option<Arc<Semaphore>>,
	entered: Arc<Notify>,
}

impl ScriptedExecutor {
	pub(crate) fn new(outcomes: impl IntoIterator<Item = ExecutionOutcome>) -> Self {
		Self {
			outcomes: Mutex::new(outcomes.into_iter().collect()),
			..Self::default()
		}
	}

	/// Every call waits for a permit on `gate` before answering.
	pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
		self.gate = Some(gate);
		self
	}

	/// Notified each time a call starts.
	pub(crate) fn entered(&self) -> Arc<Notify> {
		self.entered.clone()
	}

	pub(crate) fn calls(&self) -> Vec<LedgerRequest> {
		self.calls.lock().clone()
	}

	async fn respond(&self, request: LedgerRequest) -> ExecutionOutcome {
		self.calls.lock().push(request);
		self.entered.notify_one();
		if let Some(gate) = &self.gate {
			gate.acquire().await.expect("gate closed").forget();
		}
		self.outcomes
			.lock()
			.pop_front()
			.unwrap_or_else(ExecutionOutcome::success)
	}
}

#[async_trait::async_trait]
impl LedgerExecutor for ScriptedExecutor {
	async fn stake(&self, amount: &str, address: &str) -> ExecutionOutcome {
		self.respond(LedgerRequest::Stake {
			amount: amount.to_string(),
			address: address.to_string(),
		})
		.await
	}

	async fn unstake(&self, amount: &str, address: &str) -> ExecutionOutcome {
		self.respond(LedgerRequest::Unstake {
			amount: amount.to_string(),
			address: address.to_string(),
		})
		.await
	}

	async fn claim(&self, address: &str) -> ExecutionOutcome {
		self.respond(LedgerRequest::Claim {
			address: address.to_string(),
		})
		.await
	}
}
