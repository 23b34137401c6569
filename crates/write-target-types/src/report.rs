//! Report envelope produced by the oracle network.
//!
//! The envelope is the metadata header a DON attaches to every report. It is
//! a packed big-endian layout with no padding, so each field lives at a fixed
//! offset:
//!
//! | offset | width | field                   |
//! |--------|-------|-------------------------|
//! | 0      | 1     | version                 |
//! | 1      | 32    | workflow execution id   |
//! | 33     | 4     | timestamp               |
//! | 37     | 4     | DON id                  |
//! | 41     | 4     | DON config version      |
//! | 45     | 32    | workflow CID            |
//! | 77     | 10    | workflow name           |
//! | 87     | 20    | workflow owner          |
//! | 107    | 2     | report id               |

use crate::CodecError;
use alloy::primitives::{keccak256, Address, Bytes, FixedBytes, B256};
use serde::{Deserialize, Serialize};

/// Total width of an encoded envelope.
pub const ENVELOPE_LEN: usize = 1 + 32 + 4 + 4 + 4 + 32 + 10 + 20 + 2;

/// Metadata header of a report, as signed by the DON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportEnvelope {
	/// Encoding format tag.
	pub version: u8,
	/// Identifier of the workflow run that produced the report.
	pub workflow_execution_id: B256,
	/// Report creation time, in seconds.
	pub timestamp: u32,
	/// Identifier of the producing DON.
	pub don_id: u32,
	/// Configuration epoch of the producing DON.
	pub don_config_version: u32,
	/// Content address of the workflow definition.
	pub workflow_cid: B256,
	pub workflow_name: FixedBytes<10>,
	pub workflow_owner: Address,
	/// Distinguishes multiple reports within one workflow execution.
	pub report_id: FixedBytes<2>,
}

impl ReportEnvelope {
	/// Encodes the envelope into its packed byte layout.
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::with_capacity(ENVELOPE_LEN);
		buf.push(self.version);
		buf.extend_from_slice(self.workflow_execution_id.as_slice());
		buf.extend_from_slice(&self.timestamp.to_be_bytes());
		buf.extend_from_slice(&self.don_id.to_be_bytes());
		buf.extend_from_slice(&self.don_config_version.to_be_bytes());
		buf.extend_from_slice(self.workflow_cid.as_slice());
		buf.extend_from_slice(self.workflow_name.as_slice());
		buf.extend_from_slice(self.workflow_owner.as_slice());
		buf.extend_from_slice(self.report_id.as_slice());
		buf
	}

	/// Decodes an envelope. The input must be exactly [`ENVELOPE_LEN`] bytes.
	pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
		if data.len() != ENVELOPE_LEN {
			return Err(CodecError::malformed(format!(
				"report envelope must be {} bytes, got {}",
				ENVELOPE_LEN,
				data.len()
			)));
		}

		let mut cursor = Cursor::new(data);
		Ok(Self {
			version: cursor.take::<1>()[0],
			workflow_execution_id: B256::from(cursor.take::<32>()),
			timestamp: u32::from_be_bytes(cursor.take::<4>()),
			don_id: u32::from_be_bytes(cursor.take::<4>()),
			don_config_version: u32::from_be_bytes(cursor.take::<4>()),
			workflow_cid: B256::from(cursor.take::<32>()),
			workflow_name: FixedBytes::from(cursor.take::<10>()),
			workflow_owner: Address::from(cursor.take::<20>()),
			report_id: FixedBytes::from(cursor.take::<2>()),
		})
	}

	/// Dedup key the forwarder records for this report when sent to `receiver`.
	pub fn transmission_id(&self, receiver: Address) -> B256 {
		transmission_id(receiver, self.workflow_execution_id, self.report_id)
	}
}

/// Computes `keccak256(receiver ‖ workflowExecutionId ‖ reportId)` with packed
/// encoding, matching the forwarder's own derivation.
pub fn transmission_id(
	receiver: Address,
	workflow_execution_id: B256,
	report_id: FixedBytes<2>,
) -> B256 {
	let mut packed = Vec::with_capacity(20 + 32 + 2);
	packed.extend_from_slice(receiver.as_slice());
	packed.extend_from_slice(workflow_execution_id.as_slice());
	packed.extend_from_slice(report_id.as_slice());
	keccak256(packed)
}

/// A report together with the DON signatures over it.
///
/// Signature order is significant and is preserved verbatim all the way to
/// the forwarder call. An empty signature list is accepted here; quorum is
/// enforced upstream and on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedReport {
	/// Raw encoded [`ReportEnvelope`].
	pub report: Bytes,
	pub signatures: Vec<Bytes>,
	/// Report context forwarded untouched to the contract.
	pub context: Bytes,
	/// Must equal the report id embedded in the envelope.
	pub id: Bytes,
}

impl SignedReport {
	/// Decodes the embedded envelope and checks it against [`SignedReport::id`].
	pub fn decode_envelope(&self) -> Result<ReportEnvelope, CodecError> {
		let envelope = ReportEnvelope::decode(&self.report)?;
		if self.id[..] != envelope.report_id[..] {
			return Err(CodecError::malformed(format!(
				"report id 0x{} does not match envelope report id {}",
				hex::encode(&self.id),
				envelope.report_id
			)));
		}
		Ok(envelope)
	}
}

/// Sequential reader over an input whose length was checked up front.
pub(crate) struct Cursor<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	pub(crate) fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	pub(crate) fn take<const N: usize>(&mut self) -> [u8; N] {
		let mut out = [0u8; N];
		out.copy_from_slice(&self.data[self.pos..self.pos + N]);
		self.pos += N;
		out
	}
}
