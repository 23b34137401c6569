//! On-chain transmission record kept by the forwarder for deduplication.
//!
//! Layout of the encoded record:
//!
//! | offset | width | field                                          |
//! |--------|-------|------------------------------------------------|
//! | 0      | 80    | gas limit, big-endian, left zero padded        |
//! | 80     | 32    | invalid receiver flag, then 31 zero bytes      |
//! | 112    | 32    | state, then 31 zero bytes                      |
//! | 144    | 32    | success flag, then 31 zero bytes               |
//! | 176    | 32    | transmission id                                |
//! | 208    | 20    | transmitter address                            |

use crate::CodecError;
use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width reserved for the gas limit.
pub const GAS_LIMIT_WIDTH: usize = 80;
/// Width of one ABI word.
pub const WORD: usize = 32;
/// Total width of an encoded [`TransmissionInfo`].
pub const TRANSMISSION_INFO_LEN: usize = GAS_LIMIT_WIDTH + 4 * WORD + 20;

/// Outcome of a transmission as tracked by the forwarder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransmissionState {
	#[default]
	NotAttempted = 0,
	Succeeded = 1,
	InvalidReceiver = 2,
	Failed = 3,
}

impl TryFrom<u8> for TransmissionState {
	type Error = CodecError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(TransmissionState::NotAttempted),
			1 => Ok(TransmissionState::Succeeded),
			2 => Ok(TransmissionState::InvalidReceiver),
			3 => Ok(TransmissionState::Failed),
			other => Err(CodecError::malformed(format!(
				"unknown transmission state {}",
				other
			))),
		}
	}
}

impl fmt::Display for TransmissionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			TransmissionState::NotAttempted => "not_attempted",
			TransmissionState::Succeeded => "succeeded",
			TransmissionState::InvalidReceiver => "invalid_receiver",
			TransmissionState::Failed => "failed",
		};
		f.write_str(name)
	}
}

/// Transmission status of one report for one receiver.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransmissionInfo {
	pub gas_limit: U256,
	pub invalid_receiver: bool,
	pub state: TransmissionState,
	pub success: bool,
	pub transmission_id: B256,
	pub transmitter: Address,
}

impl TransmissionInfo {
	/// True when the report was already delivered successfully.
	pub fn is_committed(&self) -> bool {
		self.success && !self.transmitter.is_zero()
	}

	/// True when a transmission was attempted but did not succeed.
	pub fn is_failed_attempt(&self) -> bool {
		self.state != TransmissionState::NotAttempted && !self.success
	}

	/// Encodes the record into its fixed layout.
	///
	/// A `U256` gas limit is at most 32 bytes wide, so it always fits the
	/// 80-byte slot and encoding cannot overflow.
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::with_capacity(TRANSMISSION_INFO_LEN);
		buf.resize(GAS_LIMIT_WIDTH - WORD, 0);
		buf.extend_from_slice(&self.gas_limit.to_be_bytes::<WORD>());
		push_flag_slot(&mut buf, self.invalid_receiver as u8);
		push_flag_slot(&mut buf, self.state as u8);
		push_flag_slot(&mut buf, self.success as u8);
		buf.extend_from_slice(self.transmission_id.as_slice());
		buf.extend_from_slice(self.transmitter.as_slice());
		buf
	}

	/// Decodes a record. The input must be exactly [`TRANSMISSION_INFO_LEN`] bytes.
	pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
		if data.len() != TRANSMISSION_INFO_LEN {
			return Err(CodecError::malformed(format!(
				"transmission info must be {} bytes, got {}",
				TRANSMISSION_INFO_LEN,
				data.len()
			)));
		}

		let (gas_slot, rest) = data.split_at(GAS_LIMIT_WIDTH);
		let (high, low) = gas_slot.split_at(GAS_LIMIT_WIDTH - WORD);
		if high.iter().any(|&b| b != 0) {
			return Err(CodecError::FieldOverflow {
				field: "gas_limit",
				width: WORD,
			});
		}

		let invalid_receiver = read_bool(&rest[..WORD], "invalid_receiver")?;
		let state = TransmissionState::try_from(read_flag_slot(&rest[WORD..2 * WORD], "state")?)?;
		let success = read_bool(&rest[2 * WORD..3 * WORD], "success")?;
		let transmission_id = B256::from_slice(&rest[3 * WORD..4 * WORD]);
		let transmitter = Address::from_slice(&rest[4 * WORD..]);

		Ok(Self {
			gas_limit: U256::from_be_slice(low),
			invalid_receiver,
			state,
			success,
			transmission_id,
			transmitter,
		})
	}
}

fn push_flag_slot(buf: &mut Vec<u8>, value: u8) {
	buf.push(value);
	buf.extend_from_slice(&[0u8; WORD - 1]);
}

fn read_flag_slot(slot: &[u8], field: &str) -> Result<u8, CodecError> {
	if slot[1..].iter().any(|&b| b != 0) {
		return Err(CodecError::malformed(format!(
			"non-zero padding after '{}'",
			field
		)));
	}
	Ok(slot[0])
}

fn read_bool(slot: &[u8], field: &str) -> Result<bool, CodecError> {
	match read_flag_slot(slot, field)? {
		0 => Ok(false),
		1 => Ok(true),
		other => Err(CodecError::malformed(format!(
			"'{}' must be 0 or 1, got {}",
			field, other
		))),
	}
}
