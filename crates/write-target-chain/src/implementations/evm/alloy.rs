//! EVM chain access over JSON-RPC using the Alloy library.
//!
//! [`AlloyChainClient`] serves `eth_call` and `eth_getCode`.
//! [`AlloyTransactionManager`] submits through an Alloy provider, which fills
//! nonce, gas price and chain id and signs with the configured local key when
//! one is given (otherwise the node signs via `eth_sendTransaction`).

use crate::{ChainClient, ChainError, TransactionManager, TxmError};
use alloy::{
	eips::BlockNumberOrTag,
	network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
	providers::{DynProvider, Provider, ProviderBuilder},
	rpc::types::TransactionRequest as RpcTransactionRequest,
	signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use tracing::{debug, info};
use write_target_types::{Address, Bytes, TransactionHandle, TransactionRequest, TxmStatus};

/// Utility function to truncate a transaction hash for display.
fn truncate_hash(handle: &TransactionHandle) -> String {
	let hash_str = hex::encode(handle.0);
	format!("{}..", &hash_str[..8])
}

/// Builds a type-erased HTTP provider, with a local wallet if a key is given.
pub fn connect_http(rpc_url: &str, private_key: Option<&str>) -> Result<DynProvider, ChainError> {
	let url = rpc_url
		.parse()
		.map_err(|e| ChainError::Configuration(format!("Invalid RPC URL: {}", e)))?;

	let provider = match private_key {
		Some(key) => {
			let signer: PrivateKeySigner = key
				.parse()
				.map_err(|e| ChainError::Configuration(format!("Invalid private key: {}", e)))?;
			debug!(address = %signer.address(), "Using local signer");
			ProviderBuilder::new()
				.wallet(EthereumWallet::from(signer))
				.connect_http(url)
				.erased()
		}
		None => ProviderBuilder::new().connect_http(url).erased(),
	};

	Ok(provider)
}

/// Read-only chain client backed by an Alloy provider.
#[derive(Clone)]
pub struct AlloyChainClient {
	provider: DynProvider,
}

impl AlloyChainClient {
	pub fn new(provider: DynProvider) -> Self {
		Self { provider }
	}
}

#[async_trait]
impl ChainClient for AlloyChainClient {
	async fn call_contract(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
		let request = RpcTransactionRequest::default()
			.with_to(to)
			.with_input(data);

		self.provider
			.call(request)
			.await
			.map_err(|e| ChainError::Rpc(format!("eth_call to {} failed: {}", to, e)))
	}

	async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
		self.provider
			.get_code_at(address)
			.await
			.map_err(|e| ChainError::Rpc(format!("eth_getCode for {} failed: {}", address, e)))
	}
}

/// Transaction manager backed by an Alloy provider.
///
/// Finality is judged against the node's `finalized` block tag.
#[derive(Clone)]
pub struct AlloyTransactionManager {
	provider: DynProvider,
}

impl AlloyTransactionManager {
	pub fn new(provider: DynProvider) -> Self {
		Self { provider }
	}
}

#[async_trait]
impl TransactionManager for AlloyTransactionManager {
	async fn create_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionHandle, TxmError> {
		let tx = RpcTransactionRequest::default()
			.with_from(request.from)
			.with_to(request.to)
			.with_input(request.encoded_payload)
			.with_gas_limit(request.gas_limit);

		// The provider's fillers and wallet handle nonce, fees and signing
		let pending = self
			.provider
			.send_transaction(tx)
			.await
			.map_err(|e| TxmError::Rejected(format!("Failed to send transaction: {}", e)))?;

		let handle = TransactionHandle(*pending.tx_hash());
		info!(
			tx_hash = %truncate_hash(&handle),
			transmission_id = %request.meta.transmission_id,
			"Submitted transaction"
		);

		Ok(handle)
	}

	async fn get_transaction_status(
		&self,
		handle: &TransactionHandle,
	) -> Result<TxmStatus, TxmError> {
		let receipt = self
			.provider
			.get_transaction_receipt(handle.0)
			.await
			.map_err(|e| TxmError::Lookup(format!("Failed to get receipt: {}", e)))?;

		let Some(receipt) = receipt else {
			let tx = self
				.provider
				.get_transaction_by_hash(handle.0)
				.await
				.map_err(|e| TxmError::Lookup(format!("Failed to get transaction: {}", e)))?;
			return Ok(if tx.is_some() {
				TxmStatus::Pending
			} else {
				TxmStatus::Unknown
			});
		};

		if !ReceiptResponse::status(&receipt) {
			return Ok(TxmStatus::Failed);
		}

		let Some(mined_in) = ReceiptResponse::block_number(&receipt) else {
			return Ok(TxmStatus::Pending);
		};

		let finalized = self
			.provider
			.get_block_by_number(BlockNumberOrTag::Finalized)
			.await
			.map_err(|e| TxmError::Lookup(format!("Failed to get finalized block: {}", e)))?;

		let status = match finalized {
			Some(block) if block.header.inner.number >= mined_in => TxmStatus::Finalized,
			_ => TxmStatus::Unconfirmed,
		};

		debug!(
			tx_hash = %truncate_hash(handle),
			block = mined_in,
			?status,
			"Resolved transaction status"
		);

		Ok(status)
	}
}
