use crate::CapabilityError;
use std::sync::Arc;
use tracing::debug;
use write_target_chain::TransactionManager;
use write_target_types::{Context, TransactionHandle, WriteStatus};

/// Reports the status of submitted transactions.
#[derive(Clone)]
pub struct StatusTracker {
	txm: Arc<dyn TransactionManager>,
}

impl StatusTracker {
	pub fn new(txm: Arc<dyn TransactionManager>) -> Self {
		Self { txm }
	}

	pub async fn get_status(
		&self,
		ctx: &Context,
		handle: &TransactionHandle,
	) -> Result<WriteStatus, CapabilityError> {
		let status = ctx
			.run(self.txm.get_transaction_status(handle))
			.await?
			.map_err(CapabilityError::StatusError)?;

		debug!(%handle, ?status, "Transaction manager status");
		Ok(status.into())
	}
}
