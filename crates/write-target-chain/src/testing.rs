//! In-memory chain client and transaction manager.
//!
//! Both fakes record every call they receive so tests can assert on how many
//! reads and submissions an operation performed. They can also be told to
//! fail or to block forever, the latter to exercise cancellation.

use crate::{ChainClient, ChainError, TransactionManager, TxmError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use write_target_types::{
	Address, Bytes, TransactionHandle, TransactionRequest, TransmissionInfo, TxmStatus, B256, U256,
};

/// Chain client answering every `eth_call` with a configurable result.
pub struct FakeChainClient {
	call_result: Mutex<Result<Bytes, ChainError>>,
	code: Mutex<HashMap<Address, Bytes>>,
	calls: Mutex<Vec<(Address, Bytes)>>,
	hang: AtomicBool,
}

impl Default for FakeChainClient {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeChainClient {
	/// A client whose calls return an encoded, never-attempted transmission.
	pub fn new() -> Self {
		Self {
			call_result: Mutex::new(Ok(TransmissionInfo::default().encode().into())),
			code: Mutex::new(HashMap::new()),
			calls: Mutex::new(Vec::new()),
			hang: AtomicBool::new(false),
		}
	}

	/// Answers subsequent calls with `info` encoded.
	pub async fn set_transmission_info(&self, info: &TransmissionInfo) {
		*self.call_result.lock().await = Ok(info.encode().into());
	}

	pub async fn set_call_result(&self, result: Result<Bytes, ChainError>) {
		*self.call_result.lock().await = result;
	}

	pub async fn set_code(&self, address: Address, code: impl Into<Bytes>) {
		self.code.lock().await.insert(address, code.into());
	}

	/// Makes every subsequent call block until dropped.
	pub fn hang(&self) {
		self.hang.store(true, Ordering::SeqCst);
	}

	pub async fn calls(&self) -> Vec<(Address, Bytes)> {
		self.calls.lock().await.clone()
	}

	pub async fn call_count(&self) -> usize {
		self.calls.lock().await.len()
	}
}

#[async_trait]
impl ChainClient for FakeChainClient {
	async fn call_contract(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
		self.calls.lock().await.push((to, data));
		if self.hang.load(Ordering::SeqCst) {
			std::future::pending::<()>().await;
		}
		self.call_result.lock().await.clone()
	}

	async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
		Ok(self
			.code
			.lock()
			.await
			.get(&address)
			.cloned()
			.unwrap_or_default())
	}
}

/// Transaction manager that records requests and hands out sequential handles.
pub struct FakeTransactionManager {
	requests: Mutex<Vec<TransactionRequest>>,
	statuses: Mutex<HashMap<TransactionHandle, TxmStatus>>,
	fail_with: Mutex<Option<String>>,
	hang: AtomicBool,
}

impl Default for FakeTransactionManager {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeTransactionManager {
	pub fn new() -> Self {
		Self {
			requests: Mutex::new(Vec::new()),
			statuses: Mutex::new(HashMap::new()),
			fail_with: Mutex::new(None),
			hang: AtomicBool::new(false),
		}
	}

	/// Makes every subsequent create call fail with `message`.
	pub async fn fail_with(&self, message: impl Into<String>) {
		*self.fail_with.lock().await = Some(message.into());
	}

	/// Makes every subsequent create call block until dropped.
	pub fn hang(&self) {
		self.hang.store(true, Ordering::SeqCst);
	}

	pub async fn set_status(&self, handle: TransactionHandle, status: TxmStatus) {
		self.statuses.lock().await.insert(handle, status);
	}

	/// Every request passed to `create_transaction`, including failed ones.
	pub async fn requests(&self) -> Vec<TransactionRequest> {
		self.requests.lock().await.clone()
	}

	pub async fn create_count(&self) -> usize {
		self.requests.lock().await.len()
	}

	pub async fn tracked(&self) -> usize {
		self.statuses.lock().await.len()
	}
}

#[async_trait]
impl TransactionManager for FakeTransactionManager {
	async fn create_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionHandle, TxmError> {
		let sequence = {
			let mut requests = self.requests.lock().await;
			requests.push(request);
			requests.len()
		};

		if self.hang.load(Ordering::SeqCst) {
			std::future::pending::<()>().await;
		}
		if let Some(message) = self.fail_with.lock().await.clone() {
			return Err(TxmError::Rejected(message));
		}

		let handle = TransactionHandle(B256::from(U256::from(sequence)));
		self.statuses
			.lock()
			.await
			.insert(handle, TxmStatus::Pending);
		Ok(handle)
	}

	async fn get_transaction_status(
		&self,
		handle: &TransactionHandle,
	) -> Result<TxmStatus, TxmError> {
		Ok(self
			.statuses
			.lock()
			.await
			.get(handle)
			.copied()
			.unwrap_or(TxmStatus::Unknown))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use write_target_types::TxMeta;

	fn request() -> TransactionRequest {
		TransactionRequest {
			from: Address::repeat_byte(1),
			to: Address::repeat_byte(2),
			encoded_payload: Bytes::from(vec![0xde, 0xad]),
			gas_limit: 400_000,
			meta: TxMeta::default(),
		}
	}

	#[tokio::test]
	async fn test_fake_txm_tracks_created_transactions() {
		let txm = FakeTransactionManager::new();
		let first = txm.create_transaction(request()).await.unwrap();
		let second = txm.create_transaction(request()).await.unwrap();
		assert_ne!(first, second);
		assert_eq!(txm.create_count().await, 2);
		assert_eq!(
			txm.get_transaction_status(&first).await.unwrap(),
			TxmStatus::Pending
		);

		txm.set_status(first, TxmStatus::Finalized).await;
		assert_eq!(
			txm.get_transaction_status(&first).await.unwrap(),
			TxmStatus::Finalized
		);
		assert_eq!(
			txm.get_transaction_status(&TransactionHandle(B256::ZERO))
				.await
				.unwrap(),
			TxmStatus::Unknown
		);
	}

	#[tokio::test]
	async fn test_fake_txm_failure_creates_no_status() {
		let txm = FakeTransactionManager::new();
		txm.fail_with("TXM error").await;
		assert!(txm.create_transaction(request()).await.is_err());
		assert_eq!(txm.create_count().await, 1);
		assert_eq!(txm.tracked().await, 0);
	}

	#[tokio::test]
	async fn test_fake_client_returns_configured_info() {
		let client = FakeChainClient::new();
		let fresh = client
			.call_contract(Address::ZERO, Bytes::new())
			.await
			.unwrap();
		assert_eq!(
			TransmissionInfo::decode(&fresh).unwrap(),
			TransmissionInfo::default()
		);

		client.set_code(Address::repeat_byte(9), vec![0x60]).await;
		assert_eq!(
			client.code_at(Address::repeat_byte(9)).await.unwrap().len(),
			1
		);
		assert!(client.code_at(Address::ZERO).await.unwrap().is_empty());
		assert_eq!(client.call_count().await, 1);
	}
}
