use crate::CapabilityError;
use std::sync::Arc;
use write_target_chain::TransactionManager;
use write_target_types::{Context, TransactionHandle, TransactionRequest};

/// Hands report transactions to the transaction manager.
///
/// Each call to [`TransactionSubmitter::submit`] makes exactly one create
/// call and never retries; retry policy belongs to the workflow.
#[derive(Clone)]
pub struct TransactionSubmitter {
	txm: Arc<dyn TransactionManager>,
}

impl TransactionSubmitter {
	pub fn new(txm: Arc<dyn TransactionManager>) -> Self {
		Self { txm }
	}

	pub async fn submit(
		&self,
		ctx: &Context,
		request: TransactionRequest,
	) -> Result<TransactionHandle, CapabilityError> {
		ctx.run(self.txm.create_transaction(request))
			.await?
			.map_err(CapabilityError::SubmissionError)
	}
}
