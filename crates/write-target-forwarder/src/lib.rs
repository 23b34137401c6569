//! Typed bindings to the forwarder contract.
//!
//! The write target needs exactly two things from a forwarder: the call data
//! for its report entry point, and the transmission record it keeps per
//! report. [`ForwarderBinding`] captures those two operations; each deployed
//! forwarder version gets its own implementation.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use write_target_chain::ChainError;
use write_target_types::{
	Address, Bytes, CodecError, ReportEnvelope, SignedReport, TransmissionInfo,
};

/// Re-export implementations
pub mod implementations {
	pub mod keystone_v1;
}

pub use implementations::keystone_v1::{DecodedReportCall, KeystoneForwarderV1};

/// Errors that can occur while talking to a forwarder.
#[derive(Debug, Error)]
pub enum BindingError {
	/// The underlying chain query failed.
	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),
	/// The contract returned bytes that are not a transmission record.
	#[error("Decode error: {0}")]
	Decode(#[from] CodecError),
	/// Call data could not be ABI decoded.
	#[error("ABI error: {0}")]
	Abi(String),
}

/// Capability-specific view of a forwarder contract version.
#[async_trait]
pub trait ForwarderBinding: Send + Sync {
	/// Contract version this binding speaks, e.g. `1.0.0`.
	fn version(&self) -> &'static str;

	/// Address of the forwarder contract.
	fn address(&self) -> Address;

	/// The same forwarder version bound to the deployment at `address`.
	fn at(&self, address: Address) -> Arc<dyn ForwarderBinding>;

	/// Call data for delivering `report` to `receiver` through the forwarder.
	///
	/// Must be deterministic: the same inputs always give the same bytes.
	fn build_report_call(&self, receiver: Address, report: &SignedReport) -> Bytes;

	/// Reads the forwarder's transmission record for `envelope` sent to `receiver`.
	async fn read_transmission_info(
		&self,
		receiver: Address,
		envelope: &ReportEnvelope,
	) -> Result<TransmissionInfo, BindingError>;

	/// Whether the forwarder has code deployed.
	async fn is_deployed(&self) -> Result<bool, BindingError>;
}
