//! Codec errors shared by the report envelope and transmission record.

use thiserror::Error;

/// Errors produced while encoding or decoding fixed-layout records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
	/// The input does not have the exact layout of the record.
	#[error("Malformed envelope: {0}")]
	MalformedEnvelope(String),
	/// An integer does not fit the width reserved for it.
	#[error("Field '{field}' does not fit in {width} bytes")]
	FieldOverflow { field: &'static str, width: usize },
}

impl CodecError {
	pub(crate) fn malformed(message: impl Into<String>) -> Self {
		CodecError::MalformedEnvelope(message.into())
	}
}
