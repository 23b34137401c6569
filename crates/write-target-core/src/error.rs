use thiserror::Error;
use write_target_chain::TxmError;
use write_target_forwarder::BindingError;
use write_target_types::{Address, Cancelled, CodecError, TransmissionState, B256};

/// Errors returned from a write capability invocation.
#[derive(Error, Debug)]
pub enum CapabilityError {
	#[error("Invalid config: {0}")]
	InvalidConfig(String),

	#[error("Malformed envelope: {0}")]
	MalformedEnvelope(String),

	#[error("Field '{field}' does not fit in {width} bytes")]
	FieldOverflow { field: &'static str, width: usize },

	#[error("Failed to read transmission state: {0}")]
	ChainReadError(#[source] BindingError),

	#[error("Failed to submit transaction: {0}")]
	SubmissionError(#[source] TxmError),

	#[error("Failed to get transaction status: {0}")]
	StatusError(#[source] TxmError),

	#[error("Prior transmission {transmission_id} ended in state {state}")]
	PriorTransmissionFailed {
		transmission_id: B256,
		state: TransmissionState,
	},

	#[error("Operation cancelled")]
	Cancelled,
}

impl From<CodecError> for CapabilityError {
	fn from(err: CodecError) -> Self {
		match err {
			CodecError::MalformedEnvelope(message) => CapabilityError::MalformedEnvelope(message),
			CodecError::FieldOverflow { field, width } => {
				CapabilityError::FieldOverflow { field, width }
			}
		}
	}
}

impl From<Cancelled> for CapabilityError {
	fn from(_: Cancelled) -> Self {
		CapabilityError::Cancelled
	}
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
	#[error("Capability already registered: {0}")]
	DuplicateCapability(String),
}

/// Why a relayer did not register its write capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationSkipped {
	#[error("no from_address configured")]
	MissingFromAddress,

	#[error("no forwarder_address configured")]
	MissingForwarderAddress,

	#[error("no contract code at forwarder {0}")]
	ForwarderNotDeployed(Address),

	#[error("could not check forwarder code: {0}")]
	ForwarderLookupFailed(String),
}
