//! The write target capability.

use crate::{
	gas_limit_override, receiver_override, validate_config, CapabilityError, ChainStateReader,
	StatusTracker, TransactionBuilder, TransactionSubmitter,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use write_target_chain::TransactionManager;
use write_target_config::FailedTransmissionPolicy;
use write_target_forwarder::ForwarderBinding;
use write_target_types::{
	Address, Bytes, CapabilityInfo, CapabilityRequest, CapabilityResponse, CapabilityType,
	Context, SignedReport, TransactionHandle, Value, ValueMap, WriteOutcome, WriteStatus,
};

/// Input key holding the signed report map.
pub const SIGNED_REPORT_KEY: &str = "signed_report";

/// A workflow-callable unit of functionality.
#[async_trait]
pub trait Capability: Send + Sync {
	fn info(&self) -> CapabilityInfo;

	async fn execute(
		&self,
		ctx: &Context,
		request: CapabilityRequest,
	) -> Result<CapabilityResponse, CapabilityError>;

	/// Status of a transaction created by an earlier `execute`.
	async fn status(
		&self,
		ctx: &Context,
		handle: &TransactionHandle,
	) -> Result<WriteStatus, CapabilityError>;
}

/// Chain-scoped settings of a [`WriteTarget`].
#[derive(Debug, Clone)]
pub struct WriteTargetSettings {
	pub chain_name: String,
	/// Sender of report transactions.
	pub from_address: Address,
	pub gas_limit_default: u64,
	pub failed_transmission_policy: FailedTransmissionPolicy,
}

/// Writes signed reports to their receiver through a forwarder.
///
/// Each request names the forwarder it writes through in its `Address`
/// config. The chain's configured forwarder is the default binding; other
/// addresses get the same contract version bound at that address.
pub struct WriteTarget {
	info: CapabilityInfo,
	settings: WriteTargetSettings,
	forwarder: Arc<dyn ForwarderBinding>,
	submitter: TransactionSubmitter,
	tracker: StatusTracker,
}

impl WriteTarget {
	pub fn new(
		settings: WriteTargetSettings,
		forwarder: Arc<dyn ForwarderBinding>,
		txm: Arc<dyn TransactionManager>,
	) -> Self {
		let info = CapabilityInfo {
			id: Self::capability_id(&settings.chain_name, forwarder.version()),
			capability_type: CapabilityType::Target,
			description: format!("Write target for chain {}", settings.chain_name),
		};

		Self {
			info,
			settings,
			forwarder,
			submitter: TransactionSubmitter::new(txm.clone()),
			tracker: StatusTracker::new(txm),
		}
	}

	/// Registry id, e.g. `write_ethereum-testnet-sepolia@1.0.0`.
	pub fn capability_id(chain_name: &str, version: &str) -> String {
		format!("write_{}@{}", chain_name, version)
	}

	fn forwarder_at(&self, address: Address) -> Arc<dyn ForwarderBinding> {
		if address == self.forwarder.address() {
			self.forwarder.clone()
		} else {
			debug!(
				configured = %self.forwarder.address(),
				requested = %address,
				"Using requested forwarder"
			);
			self.forwarder.at(address)
		}
	}
}

#[async_trait]
impl Capability for WriteTarget {
	fn info(&self) -> CapabilityInfo {
		self.info.clone()
	}

	#[instrument(
		skip_all,
		fields(
			capability = %self.info.id,
			workflow_id = %request.metadata.workflow_id,
			workflow_owner = %request.metadata.workflow_owner,
			workflow_name = %request.metadata.workflow_name,
			workflow_execution_id = %request.metadata.workflow_execution_id,
		)
	)]
	async fn execute(
		&self,
		ctx: &Context,
		request: CapabilityRequest,
	) -> Result<CapabilityResponse, CapabilityError> {
		debug!("Received write request");

		let forwarder_address = validate_config(&request.config)?;
		let receiver = receiver_override(&request.config)?.unwrap_or(forwarder_address);
		let gas_limit = gas_limit_override(&request.config)?
			.unwrap_or(self.settings.gas_limit_default);
		debug!(forwarder = %forwarder_address, %receiver, gas_limit, "Config validated");

		let report = signed_report_from_inputs(&request.inputs)?;
		let envelope = report.decode_envelope()?;
		let transmission_id = envelope.transmission_id(receiver);
		debug!(
			report_id = %envelope.report_id,
			%transmission_id,
			signatures = report.signatures.len(),
			"Report decoded"
		);

		let forwarder = self.forwarder_at(forwarder_address);
		let transmission = ChainStateReader::new(forwarder.clone())
			.get_transmission_info(ctx, receiver, &envelope)
			.await?;
		debug!(
			state = %transmission.state,
			success = transmission.success,
			"Transmission state checked"
		);

		if transmission.is_committed() {
			info!(
				%transmission_id,
				transmitter = %transmission.transmitter,
				"Report already transmitted, skipping submission"
			);
			return Ok(CapabilityResponse::new(WriteOutcome::AlreadyTransmitted {
				transmission_id,
				transmitter: transmission.transmitter,
			}));
		}

		if transmission.is_failed_attempt() {
			match self.settings.failed_transmission_policy {
				FailedTransmissionPolicy::Reject => {
					warn!(%transmission_id, state = %transmission.state, "Prior transmission failed, rejecting");
					return Err(CapabilityError::PriorTransmissionFailed {
						transmission_id,
						state: transmission.state,
					});
				}
				FailedTransmissionPolicy::Resubmit => {
					warn!(%transmission_id, state = %transmission.state, "Prior transmission failed, resubmitting");
				}
			}
		}

		let tx = TransactionBuilder::new(forwarder).build(
			self.settings.from_address,
			receiver,
			&report,
			&envelope,
			gas_limit,
		);
		debug!(payload_len = tx.encoded_payload.len(), "Transaction built");

		let handle = self.submitter.submit(ctx, tx).await?;
		info!(%handle, %transmission_id, "Report submitted");

		Ok(CapabilityResponse::new(WriteOutcome::Submitted {
			handle,
			transmission_id,
			receiver,
		}))
	}

	async fn status(
		&self,
		ctx: &Context,
		handle: &TransactionHandle,
	) -> Result<WriteStatus, CapabilityError> {
		self.tracker.get_status(ctx, handle).await
	}
}

/// Reads `inputs.signed_report` into a [`SignedReport`].
fn signed_report_from_inputs(inputs: &ValueMap) -> Result<SignedReport, CapabilityError> {
	let map = inputs
		.get(SIGNED_REPORT_KEY)
		.and_then(Value::as_map)
		.ok_or_else(|| {
			CapabilityError::MalformedEnvelope(format!("missing '{}' input", SIGNED_REPORT_KEY))
		})?;

	let signatures = match map.get("signatures") {
		Some(value) => value
			.as_list()
			.ok_or_else(|| mistyped("signatures", "list", value))?
			.iter()
			.map(|sig| {
				sig.as_bytes()
					.map(Bytes::copy_from_slice)
					.ok_or_else(|| mistyped("signatures[]", "bytes", sig))
			})
			.collect::<Result<Vec<_>, _>>()?,
		None => return Err(missing("signatures")),
	};

	Ok(SignedReport {
		report: bytes_field(map, "report")?,
		signatures,
		context: bytes_field(map, "context")?,
		id: bytes_field(map, "id")?,
	})
}

fn bytes_field(map: &ValueMap, key: &'static str) -> Result<Bytes, CapabilityError> {
	let value = map.get(key).ok_or_else(|| missing(key))?;
	value
		.as_bytes()
		.map(Bytes::copy_from_slice)
		.ok_or_else(|| mistyped(key, "bytes", value))
}

fn missing(key: &str) -> CapabilityError {
	CapabilityError::MalformedEnvelope(format!("signed report is missing '{}'", key))
}

fn mistyped(key: &str, expected: &str, value: &Value) -> CapabilityError {
	CapabilityError::MalformedEnvelope(format!(
		"signed report '{}' must be {}, got {}",
		key,
		expected,
		value.kind()
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use write_target_chain::testing::{FakeChainClient, FakeTransactionManager};
	use write_target_forwarder::KeystoneForwarderV1;
	use write_target_types::{
		FixedBytes, ReportEnvelope, TransmissionInfo, TransmissionState, TxmStatus, B256,
	};

	const FORWARDER: &str = "0xf0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0";
	const OTHER_FORWARDER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

	struct Harness {
		client: Arc<FakeChainClient>,
		txm: Arc<FakeTransactionManager>,
		target: WriteTarget,
	}

	fn harness_with_policy(policy: FailedTransmissionPolicy) -> Harness {
		let client = Arc::new(FakeChainClient::new());
		let txm = Arc::new(FakeTransactionManager::new());
		let forwarder = Arc::new(KeystoneForwarderV1::new(
			Address::repeat_byte(0xf0),
			client.clone(),
		));
		let target = WriteTarget::new(
			WriteTargetSettings {
				chain_name: "anvil".to_string(),
				from_address: Address::repeat_byte(0x01),
				gas_limit_default: 400_000,
				failed_transmission_policy: policy,
			},
			forwarder,
			txm.clone(),
		);
		Harness {
			client,
			txm,
			target,
		}
	}

	fn harness() -> Harness {
		harness_with_policy(FailedTransmissionPolicy::Resubmit)
	}

	fn envelope() -> ReportEnvelope {
		ReportEnvelope {
			version: 1,
			workflow_execution_id: B256::repeat_byte(0x11),
			report_id: FixedBytes::from([0x00, 0x01]),
			..Default::default()
		}
	}

	fn signed_report_value(envelope: &ReportEnvelope, id: Vec<u8>) -> Value {
		let mut map = ValueMap::new();
		map.insert("report".into(), envelope.encode().into());
		map.insert("signatures".into(), Value::List(vec![]));
		map.insert("context".into(), Vec::<u8>::new().into());
		map.insert("id".into(), id.into());
		Value::Map(map)
	}

	fn request_with(address: &str, signed_report: Value) -> CapabilityRequest {
		let mut config = ValueMap::new();
		config.insert("Address".into(), address.into());
		let mut inputs = ValueMap::new();
		inputs.insert(SIGNED_REPORT_KEY.into(), signed_report);
		CapabilityRequest {
			config,
			inputs,
			..Default::default()
		}
	}

	fn request() -> CapabilityRequest {
		request_with(FORWARDER, signed_report_value(&envelope(), vec![0x00, 0x01]))
	}

	fn committed() -> TransmissionInfo {
		TransmissionInfo {
			gas_limit: write_target_types::U256::from(400_000u64),
			state: TransmissionState::Succeeded,
			success: true,
			transmission_id: B256::repeat_byte(0x42),
			transmitter: Address::repeat_byte(0x07),
			..Default::default()
		}
	}

	#[test]
	fn test_capability_id() {
		let h = harness();
		assert_eq!(h.target.info().id, "write_anvil@1.0.0");
		assert_eq!(h.target.info().capability_type, CapabilityType::Target);
	}

	#[tokio::test]
	async fn test_fresh_report_is_submitted() {
		let h = harness();
		let response = h
			.target
			.execute(&Context::background(), request())
			.await
			.unwrap();

		let receiver = Address::repeat_byte(0xf0);
		let (handle, transmission_id, submitted_to) = match response.outcome {
			WriteOutcome::Submitted {
				handle,
				transmission_id,
				receiver,
			} => (handle, transmission_id, receiver),
			other => panic!("expected a submission, got {:?}", other),
		};
		assert_eq!(submitted_to, receiver);
		assert_eq!(transmission_id, envelope().transmission_id(receiver));

		let requests = h.txm.requests().await;
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].gas_limit, 400_000);
		assert_eq!(requests[0].from, Address::repeat_byte(0x01));
		assert_eq!(requests[0].to, Address::repeat_byte(0xf0));

		let call = KeystoneForwarderV1::decode_report_call(&requests[0].encoded_payload).unwrap();
		assert_eq!(call.receiver, receiver);
		assert_eq!(call.raw_report.to_vec(), envelope().encode());
		assert!(call.signatures.is_empty());

		assert_eq!(
			h.target
				.status(&Context::background(), &handle)
				.await
				.unwrap(),
			WriteStatus::Pending
		);
	}

	#[tokio::test]
	async fn test_address_overrides_configured_forwarder() {
		let h = harness();
		let other: Address = OTHER_FORWARDER.to_lowercase().parse().unwrap();
		let request =
			request_with(OTHER_FORWARDER, signed_report_value(&envelope(), vec![0x00, 0x01]));

		h.target
			.execute(&Context::background(), request)
			.await
			.unwrap();

		let reads = h.client.calls().await;
		assert_eq!(reads.len(), 1);
		assert_eq!(reads[0].0, other);

		let requests = h.txm.requests().await;
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].to, other);
		let call = KeystoneForwarderV1::decode_report_call(&requests[0].encoded_payload).unwrap();
		assert_eq!(call.receiver, other);
	}

	#[tokio::test]
	async fn test_receiver_key_sets_report_receiver() {
		let h = harness();
		let receiver = Address::repeat_byte(0xaa);
		let mut req = request();
		req.config
			.insert("Receiver".into(), Value::from(receiver.to_string()));

		let response = h
			.target
			.execute(&Context::background(), req)
			.await
			.unwrap();
		assert!(matches!(
			response.outcome,
			WriteOutcome::Submitted { receiver: r, transmission_id, .. }
				if r == receiver && transmission_id == envelope().transmission_id(receiver)
		));

		assert_eq!(h.client.calls().await[0].0, Address::repeat_byte(0xf0));
		let requests = h.txm.requests().await;
		assert_eq!(requests[0].to, Address::repeat_byte(0xf0));
		let call = KeystoneForwarderV1::decode_report_call(&requests[0].encoded_payload).unwrap();
		assert_eq!(call.receiver, receiver);
	}

	#[tokio::test]
	async fn test_second_execute_after_success_submits_nothing() {
		let h = harness();
		let ctx = Context::background();
		h.target.execute(&ctx, request()).await.unwrap();
		assert_eq!(h.txm.create_count().await, 1);

		h.client.set_transmission_info(&committed()).await;
		let response = h.target.execute(&ctx, request()).await.unwrap();

		assert!(matches!(
			response.outcome,
			WriteOutcome::AlreadyTransmitted { transmitter, .. } if transmitter == Address::repeat_byte(0x07)
		));
		assert_eq!(h.txm.create_count().await, 1);
	}

	#[tokio::test]
	async fn test_invalid_address_touches_nothing() {
		let h = harness();
		let result = h
			.target
			.execute(
				&Context::background(),
				request_with("invalid-address", signed_report_value(&envelope(), vec![0, 1])),
			)
			.await;

		assert!(matches!(result, Err(CapabilityError::InvalidConfig(_))));
		assert_eq!(h.client.call_count().await, 0);
		assert_eq!(h.txm.create_count().await, 0);
	}

	#[tokio::test]
	async fn test_txm_error_propagates() {
		let h = harness();
		h.txm.fail_with("TXM error").await;

		let result = h.target.execute(&Context::background(), request()).await;
		assert!(matches!(result, Err(CapabilityError::SubmissionError(_))));
		assert_eq!(h.txm.create_count().await, 1);
		assert_eq!(h.txm.tracked().await, 0);
	}

	#[tokio::test]
	async fn test_report_id_mismatch_is_malformed() {
		let h = harness();
		let result = h
			.target
			.execute(
				&Context::background(),
				request_with(FORWARDER, signed_report_value(&envelope(), vec![0x00, 0x02])),
			)
			.await;

		assert!(matches!(result, Err(CapabilityError::MalformedEnvelope(_))));
		assert_eq!(h.client.call_count().await, 0);
	}

	#[tokio::test]
	async fn test_missing_signed_report_fields() {
		let h = harness();
		let ctx = Context::background();

		let mut no_context = ValueMap::new();
		no_context.insert("report".into(), envelope().encode().into());
		no_context.insert("signatures".into(), Value::List(vec![]));
		no_context.insert("id".into(), vec![0u8, 1].into());
		let result = h
			.target
			.execute(&ctx, request_with(FORWARDER, Value::Map(no_context)))
			.await;
		assert!(matches!(result, Err(CapabilityError::MalformedEnvelope(_))));

		let result = h
			.target
			.execute(&ctx, request_with(FORWARDER, Value::from("not a map")))
			.await;
		assert!(matches!(result, Err(CapabilityError::MalformedEnvelope(_))));

		let mut truncated = ValueMap::new();
		truncated.insert("report".into(), vec![1u8; 12].into());
		truncated.insert("signatures".into(), Value::List(vec![]));
		truncated.insert("context".into(), Vec::<u8>::new().into());
		truncated.insert("id".into(), vec![0u8, 1].into());
		let result = h
			.target
			.execute(&ctx, request_with(FORWARDER, Value::Map(truncated)))
			.await;
		assert!(matches!(result, Err(CapabilityError::MalformedEnvelope(_))));
	}

	#[tokio::test]
	async fn test_chain_read_error_stops_before_submission() {
		let h = harness();
		h.client
			.set_call_result(Err(write_target_chain::ChainError::Rpc("down".into())))
			.await;

		let result = h.target.execute(&Context::background(), request()).await;
		assert!(matches!(result, Err(CapabilityError::ChainReadError(_))));
		assert_eq!(h.txm.create_count().await, 0);
	}

	#[tokio::test]
	async fn test_failed_attempt_policies() {
		let failed = TransmissionInfo {
			state: TransmissionState::Failed,
			success: false,
			transmitter: Address::repeat_byte(0x07),
			..Default::default()
		};

		let resubmit = harness_with_policy(FailedTransmissionPolicy::Resubmit);
		resubmit.client.set_transmission_info(&failed).await;
		let response = resubmit
			.target
			.execute(&Context::background(), request())
			.await
			.unwrap();
		assert!(matches!(response.outcome, WriteOutcome::Submitted { .. }));
		assert_eq!(resubmit.txm.create_count().await, 1);

		let reject = harness_with_policy(FailedTransmissionPolicy::Reject);
		reject.client.set_transmission_info(&failed).await;
		let result = reject.target.execute(&Context::background(), request()).await;
		assert!(matches!(
			result,
			Err(CapabilityError::PriorTransmissionFailed {
				state: TransmissionState::Failed,
				..
			})
		));
		assert_eq!(reject.txm.create_count().await, 0);
	}

	#[tokio::test]
	async fn test_gas_limit_override_is_used() {
		let h = harness();
		let mut req = request();
		req.config.insert("GasLimit".into(), Value::from(750_000i64));

		h.target.execute(&Context::background(), req).await.unwrap();
		assert_eq!(h.txm.requests().await[0].gas_limit, 750_000);
	}

	#[tokio::test]
	async fn test_cancelled_during_submission() {
		let h = harness();
		h.txm.hang();
		let (ctx, cancel) = Context::with_cancel();

		let execution = h.target.execute(&ctx, request());
		let canceller = async {
			while h.txm.create_count().await == 0 {
				tokio::task::yield_now().await;
			}
			cancel.cancel();
		};
		let (result, _) = tokio::join!(execution, canceller);

		assert!(matches!(result, Err(CapabilityError::Cancelled)));
	}

	#[tokio::test]
	async fn test_concurrent_executes_each_submit_once() {
		let h = harness();
		let ctx = Context::background();

		let results =
			futures::future::join_all((0..8).map(|_| h.target.execute(&ctx, request()))).await;

		assert!(results.iter().all(|r| r.is_ok()));
		assert_eq!(h.txm.create_count().await, 8);
	}

	#[tokio::test]
	async fn test_status_passthrough() {
		let h = harness();
		let ctx = Context::background();
		let handle = TransactionHandle(B256::repeat_byte(0x33));

		h.txm.set_status(handle, TxmStatus::Failed).await;
		assert_eq!(
			h.target.status(&ctx, &handle).await.unwrap(),
			WriteStatus::Failed
		);
	}
}
