//! Keystone forwarder, version 1.0.0.

use crate::{BindingError, ForwarderBinding};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use write_target_chain::ChainClient;
use write_target_types::{Address, Bytes, ReportEnvelope, SignedReport, TransmissionInfo};

sol! {
	/// Entry points of the Keystone forwarder used by the write target.
	interface IKeystoneForwarder {
		function report(
			address receiver,
			bytes rawReport,
			bytes reportContext,
			bytes[] signatures
		) external;

		// Returns the fixed-layout transmission record decoded by
		// `TransmissionInfo::decode`.
		function getTransmissionInfo(
			address receiver,
			bytes32 workflowExecutionId,
			bytes2 reportId
		) external view;
	}
}

/// Arguments recovered from `report` call data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedReportCall {
	pub receiver: Address,
	pub raw_report: Bytes,
	pub report_context: Bytes,
	pub signatures: Vec<Bytes>,
}

/// Binding for a deployed Keystone forwarder v1.
#[derive(Clone)]
pub struct KeystoneForwarderV1 {
	address: Address,
	client: Arc<dyn ChainClient>,
}

impl KeystoneForwarderV1 {
	pub const VERSION: &'static str = "1.0.0";

	pub fn new(address: Address, client: Arc<dyn ChainClient>) -> Self {
		Self { address, client }
	}

	/// Decodes `report` call data, for auditing what was submitted.
	pub fn decode_report_call(data: &[u8]) -> Result<DecodedReportCall, BindingError> {
		let call = IKeystoneForwarder::reportCall::abi_decode(data)
			.map_err(|e| BindingError::Abi(e.to_string()))?;
		Ok(DecodedReportCall {
			receiver: call.receiver,
			raw_report: call.rawReport,
			report_context: call.reportContext,
			signatures: call.signatures,
		})
	}

	fn transmission_info_call(receiver: Address, envelope: &ReportEnvelope) -> Bytes {
		IKeystoneForwarder::getTransmissionInfoCall {
			receiver,
			workflowExecutionId: envelope.workflow_execution_id,
			reportId: envelope.report_id,
		}
		.abi_encode()
		.into()
	}
}

#[async_trait]
impl ForwarderBinding for KeystoneForwarderV1 {
	fn version(&self) -> &'static str {
		Self::VERSION
	}

	fn address(&self) -> Address {
		self.address
	}

	fn at(&self, address: Address) -> Arc<dyn ForwarderBinding> {
		Arc::new(Self::new(address, self.client.clone()))
	}

	fn build_report_call(&self, receiver: Address, report: &SignedReport) -> Bytes {
		IKeystoneForwarder::reportCall {
			receiver,
			rawReport: report.report.clone(),
			reportContext: report.context.clone(),
			signatures: report.signatures.clone(),
		}
		.abi_encode()
		.into()
	}

	async fn read_transmission_info(
		&self,
		receiver: Address,
		envelope: &ReportEnvelope,
	) -> Result<TransmissionInfo, BindingError> {
		let data = Self::transmission_info_call(receiver, envelope);
		let raw = self.client.call_contract(self.address, data).await?;
		let info = TransmissionInfo::decode(&raw)?;

		debug!(
			forwarder = %self.address,
			%receiver,
			state = %info.state,
			success = info.success,
			"Read transmission info"
		);

		Ok(info)
	}

	async fn is_deployed(&self) -> Result<bool, BindingError> {
		let code = self.client.code_at(self.address).await?;
		Ok(!code.is_empty())
	}
}
