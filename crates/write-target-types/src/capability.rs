//! Capability request and response model.
//!
//! The workflow engine talks to capabilities through loosely typed value maps.
//! [`Value`] is that dynamic value; the typed accessors on it are what the
//! write target uses to pull its config and inputs out of a request.

use crate::TransactionHandle;
use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered string-keyed map of values.
pub type ValueMap = BTreeMap<String, Value>;

/// Dynamic value carried in capability requests and responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	Bytes(Vec<u8>),
	String(String),
	Int(i64),
	Bool(bool),
	List(Vec<Value>),
	Map(ValueMap),
}

impl Value {
	/// Short type name, used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Bytes(_) => "bytes",
			Value::String(_) => "string",
			Value::Int(_) => "int",
			Value::Bool(_) => "bool",
			Value::List(_) => "list",
			Value::Map(_) => "map",
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Value::Bytes(bytes) => Some(bytes),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&ValueMap> {
		match self {
			Value::Map(map) => Some(map),
			_ => None,
		}
	}
}

impl From<Vec<u8>> for Value {
	fn from(bytes: Vec<u8>) -> Self {
		Value::Bytes(bytes)
	}
}

impl From<&[u8]> for Value {
	fn from(bytes: &[u8]) -> Self {
		Value::Bytes(bytes.to_vec())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::List(items)
	}
}

impl From<ValueMap> for Value {
	fn from(map: ValueMap) -> Self {
		Value::Map(map)
	}
}

/// Identifies the workflow run a request belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
	pub workflow_id: String,
	pub workflow_owner: String,
	pub workflow_name: String,
	pub workflow_execution_id: String,
}

/// A single capability invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilityRequest {
	pub metadata: RequestMetadata,
	pub config: ValueMap,
	pub inputs: ValueMap,
}

/// What a write invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteOutcome {
	/// A new transaction was handed to the transaction manager.
	Submitted {
		handle: TransactionHandle,
		transmission_id: B256,
		receiver: Address,
	},
	/// The forwarder already recorded a successful transmission; nothing was sent.
	AlreadyTransmitted {
		transmission_id: B256,
		transmitter: Address,
	},
}

/// Successful result of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityResponse {
	pub outcome: WriteOutcome,
}

impl CapabilityResponse {
	pub fn new(outcome: WriteOutcome) -> Self {
		Self { outcome }
	}

	/// Renders the outcome as a value map for the workflow engine.
	pub fn into_value(self) -> Value {
		let mut map = ValueMap::new();
		match self.outcome {
			WriteOutcome::Submitted {
				handle,
				transmission_id,
				receiver,
			} => {
				map.insert("status".into(), "submitted".into());
				map.insert("tx_handle".into(), handle.0.to_vec().into());
				map.insert("transmission_id".into(), transmission_id.to_vec().into());
				map.insert("receiver".into(), receiver.to_vec().into());
			}
			WriteOutcome::AlreadyTransmitted {
				transmission_id,
				transmitter,
			} => {
				map.insert("status".into(), "already_transmitted".into());
				map.insert("transmission_id".into(), transmission_id.to_vec().into());
				map.insert("transmitter".into(), transmitter.to_vec().into());
			}
		}
		Value::Map(map)
	}
}

/// Kind of capability, as advertised in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityType {
	Trigger,
	Action,
	Consensus,
	Target,
}

/// Registry-facing description of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInfo {
	/// Unique id, e.g. `write_ethereum-testnet-sepolia@1.0.0`.
	pub id: String,
	pub capability_type: CapabilityType,
	pub description: String,
}
