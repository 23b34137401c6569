//! Transaction manager request and status types.

use alloy::primitives::{Address, Bytes, FixedBytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bookkeeping attached to a transaction request. Opaque to the
/// transaction manager; used for logs and tracing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxMeta {
	pub workflow_execution_id: B256,
	pub report_id: FixedBytes<2>,
	pub transmission_id: B256,
	pub receiver: Address,
}

/// A transaction to be created by the transaction manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
	pub from: Address,
	/// The forwarder contract.
	pub to: Address,
	pub encoded_payload: Bytes,
	pub gas_limit: u64,
	pub meta: TxMeta,
}

/// Identifier the transaction manager returns for a created transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHandle(pub B256);

impl fmt::Display for TransactionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for TransactionHandle {
	type Err = <B256 as FromStr>::Err;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		B256::from_str(s).map(TransactionHandle)
	}
}

impl From<B256> for TransactionHandle {
	fn from(hash: B256) -> Self {
		TransactionHandle(hash)
	}
}

/// Lifecycle status as reported by the transaction manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxmStatus {
	/// The manager has no record of the transaction.
	Unknown,
	/// Created or broadcast but not yet mined.
	Pending,
	/// Mined but not yet final.
	Unconfirmed,
	Finalized,
	/// Mined and reverted.
	Failed,
	/// Could never be broadcast.
	Fatal,
}

/// Status exposed to callers of the write capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
	Pending,
	Finalized,
	Failed,
}

impl From<TxmStatus> for WriteStatus {
	fn from(status: TxmStatus) -> Self {
		match status {
			TxmStatus::Unknown | TxmStatus::Pending | TxmStatus::Unconfirmed => {
				WriteStatus::Pending
			}
			TxmStatus::Finalized => WriteStatus::Finalized,
			TxmStatus::Failed | TxmStatus::Fatal => WriteStatus::Failed,
		}
	}
}
