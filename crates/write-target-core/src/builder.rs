//! Report transaction construction.

use std::sync::Arc;
use write_target_forwarder::ForwarderBinding;
use write_target_types::{
	Address, ReportEnvelope, SignedReport, TransactionRequest, TxMeta,
};

/// Turns a signed report into a forwarder transaction request.
#[derive(Clone)]
pub struct TransactionBuilder {
	forwarder: Arc<dyn ForwarderBinding>,
}

impl TransactionBuilder {
	pub fn new(forwarder: Arc<dyn ForwarderBinding>) -> Self {
		Self { forwarder }
	}

	/// Builds the `report` call from `from` through the forwarder to `receiver`.
	///
	/// The raw envelope, context and signatures are embedded verbatim, so the
	/// same inputs always yield the same payload.
	pub fn build(
		&self,
		from: Address,
		receiver: Address,
		report: &SignedReport,
		envelope: &ReportEnvelope,
		gas_limit: u64,
	) -> TransactionRequest {
		TransactionRequest {
			from,
			to: self.forwarder.address(),
			encoded_payload: self.forwarder.build_report_call(receiver, report),
			gas_limit,
			meta: TxMeta {
				workflow_execution_id: envelope.workflow_execution_id,
				report_id: envelope.report_id,
				transmission_id: envelope.transmission_id(receiver),
				receiver,
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use write_target_chain::testing::FakeChainClient;
	use write_target_forwarder::KeystoneForwarderV1;
	use write_target_types::{Bytes, FixedBytes, B256};

	#[test]
	fn test_build_targets_forwarder() {
		let forwarder_address = Address::repeat_byte(0xf0);
		let builder = TransactionBuilder::new(Arc::new(KeystoneForwarderV1::new(
			forwarder_address,
			Arc::new(FakeChainClient::new()),
		)));

		let envelope = ReportEnvelope {
			version: 1,
			workflow_execution_id: B256::repeat_byte(0x11),
			report_id: FixedBytes::from([0x00, 0x01]),
			..Default::default()
		};
		let report = SignedReport {
			report: envelope.encode().into(),
			signatures: vec![Bytes::from(vec![7u8; 65])],
			context: Bytes::from(vec![1, 2, 3]),
			id: Bytes::from(vec![0x00, 0x01]),
		};
		let from = Address::repeat_byte(0x01);
		let receiver = Address::repeat_byte(0xaa);

		let request = builder.build(from, receiver, &report, &envelope, 123_456);
		assert_eq!(request.from, from);
		assert_eq!(request.to, forwarder_address);
		assert_eq!(request.gas_limit, 123_456);
		assert_eq!(request.meta.receiver, receiver);
		assert_eq!(request.meta.workflow_execution_id, envelope.workflow_execution_id);
		assert_eq!(request.meta.transmission_id, envelope.transmission_id(receiver));

		let decoded = KeystoneForwarderV1::decode_report_call(&request.encoded_payload).unwrap();
		assert_eq!(decoded.raw_report, report.report);
		assert_eq!(decoded.signatures, report.signatures);
		assert_eq!(decoded.report_context, report.context);

		let again = builder.build(from, receiver, &report, &envelope, 123_456);
		assert_eq!(again, request);
	}
}
