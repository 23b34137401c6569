//! Chain access for the write target.
//!
//! The write target needs two services from the chain it writes to: a
//! read-only client used to query contract state, and a transaction manager
//! that owns nonce allocation, gas pricing, broadcasting and confirmation
//! tracking. Both are consumed through the traits below; the rest of the
//! workspace never talks to a node directly.

use async_trait::async_trait;
use thiserror::Error;
use write_target_types::{Address, Bytes, TransactionHandle, TransactionRequest, TxmStatus};

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Errors returned by a [`ChainClient`].
#[derive(Debug, Clone, Error)]
pub enum ChainError {
	/// The node could not be reached or returned an error.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// The client was configured with invalid parameters.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Errors returned by a [`TransactionManager`].
#[derive(Debug, Clone, Error)]
pub enum TxmError {
	/// The manager refused to create the transaction.
	#[error("Transaction rejected: {0}")]
	Rejected(String),
	/// The manager could not look up a transaction.
	#[error("Status lookup failed: {0}")]
	Lookup(String),
}

/// Read-only access to contract state.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Executes a call against `to` without creating a transaction.
	async fn call_contract(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

	/// Returns the deployed code at `address`; empty if there is none.
	async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;
}

/// Owns the lifecycle of transactions after they are handed over.
///
/// Every call to [`TransactionManager::create_transaction`] consumes a nonce
/// and may cost gas, so callers must not call it speculatively.
#[async_trait]
pub trait TransactionManager: Send + Sync {
	async fn create_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionHandle, TxmError>;

	async fn get_transaction_status(
		&self,
		handle: &TransactionHandle,
	) -> Result<TxmStatus, TxmError>;
}
