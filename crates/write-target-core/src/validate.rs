//! Request config validation.

use crate::CapabilityError;
use write_target_types::{is_hex_address, Address, Value, ValueMap};

/// Config key holding the forwarder contract address of an invocation.
pub const ADDRESS_KEY: &str = "Address";

/// Optional config key naming the contract the forwarder delivers to.
/// Defaults to the `Address` value.
pub const RECEIVER_KEY: &str = "Receiver";

/// Optional config key overriding the chain's default gas limit.
pub const GAS_LIMIT_KEY: &str = "GasLimit";

/// Extracts the forwarder address an invocation writes through.
///
/// Mixed-case addresses must carry a valid EIP-55 checksum; all-lowercase and
/// all-uppercase addresses are accepted as is.
pub fn validate_config(config: &ValueMap) -> Result<Address, CapabilityError> {
	let value = config
		.get(ADDRESS_KEY)
		.ok_or_else(|| CapabilityError::InvalidConfig(format!("missing '{}'", ADDRESS_KEY)))?;
	parse_address(ADDRESS_KEY, value)
}

/// Reads the optional receiver from a request config.
pub fn receiver_override(config: &ValueMap) -> Result<Option<Address>, CapabilityError> {
	config
		.get(RECEIVER_KEY)
		.map(|value| parse_address(RECEIVER_KEY, value))
		.transpose()
}

fn parse_address(key: &str, value: &Value) -> Result<Address, CapabilityError> {
	let raw = value.as_str().ok_or_else(|| {
		CapabilityError::InvalidConfig(format!(
			"'{}' must be a string, got {}",
			key,
			value.kind()
		))
	})?;

	if !is_hex_address(raw) {
		return Err(CapabilityError::InvalidConfig(format!(
			"'{}' is not a 0x-prefixed 20-byte hex address",
			raw
		)));
	}

	let digits = &raw[2..];
	let mixed_case = digits.chars().any(|c| c.is_ascii_uppercase())
		&& digits.chars().any(|c| c.is_ascii_lowercase());

	if mixed_case {
		Address::parse_checksummed(raw, None)
			.map_err(|e| CapabilityError::InvalidConfig(format!("'{}': {}", raw, e)))
	} else {
		raw.parse()
			.map_err(|e| CapabilityError::InvalidConfig(format!("'{}': {}", raw, e)))
	}
}

/// Reads the optional gas limit override from a request config.
pub fn gas_limit_override(config: &ValueMap) -> Result<Option<u64>, CapabilityError> {
	let Some(value) = config.get(GAS_LIMIT_KEY) else {
		return Ok(None);
	};

	match value.as_int() {
		Some(limit) if limit > 0 => Ok(Some(limit as u64)),
		Some(limit) => Err(CapabilityError::InvalidConfig(format!(
			"'{}' must be positive, got {}",
			GAS_LIMIT_KEY, limit
		))),
		None => Err(CapabilityError::InvalidConfig(format!(
			"'{}' must be an integer, got {}",
			GAS_LIMIT_KEY,
			value.kind()
		))),
	}
}
