//! Forwarder state lookups.

use crate::CapabilityError;
use std::sync::Arc;
use write_target_forwarder::ForwarderBinding;
use write_target_types::{Address, Context, ReportEnvelope, TransmissionInfo};

/// Reads the forwarder's transmission record, which decides whether a report
/// still needs to be submitted.
#[derive(Clone)]
pub struct ChainStateReader {
	forwarder: Arc<dyn ForwarderBinding>,
}

impl ChainStateReader {
	pub fn new(forwarder: Arc<dyn ForwarderBinding>) -> Self {
		Self { forwarder }
	}

	pub async fn get_transmission_info(
		&self,
		ctx: &Context,
		receiver: Address,
		envelope: &ReportEnvelope,
	) -> Result<TransmissionInfo, CapabilityError> {
		ctx.run(self.forwarder.read_transmission_info(receiver, envelope))
			.await?
			.map_err(CapabilityError::ChainReadError)
	}
}
