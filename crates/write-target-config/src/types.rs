//! Configuration types for the write target service.

use serde::{Deserialize, Serialize};
use write_target_types::{Address, ConfigSchema, Field, FieldType, Schema, ValidationError};

/// Gas limit used when a workflow does not override it.
pub const DEFAULT_GAS_LIMIT: u64 = 400_000;

/// Complete service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriteTargetConfig {
	#[serde(default)]
	pub service: ServiceConfig,
	#[serde(default)]
	pub chains: Vec<ChainConfig>,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	#[serde(default = "default_service_name")]
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default = "default_http_port")]
	pub http_port: u16,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			name: default_service_name(),
			log_level: default_log_level(),
			http_port: default_http_port(),
		}
	}
}

/// One chain the service writes to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Chain name, also used in the capability id.
	pub name: String,
	pub chain_id: u64,
	pub rpc_url: String,
	/// Local signing key. Without one the node is expected to sign.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub private_key: Option<String>,
	#[serde(default)]
	pub workflow: WorkflowConfig,
}

/// Settings for relaying workflow reports on a chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
	/// Account that signs and pays for report transactions.
	#[serde(default)]
	pub from_address: Option<Address>,
	/// Forwarder contract reports are routed through.
	#[serde(default)]
	pub forwarder_address: Option<Address>,
	#[serde(default = "default_gas_limit")]
	pub gas_limit_default: u64,
	#[serde(default)]
	pub failed_transmission_policy: FailedTransmissionPolicy,
}

/// What to do when the forwarder reports a prior attempt that did not succeed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedTransmissionPolicy {
	/// Submit again.
	#[default]
	Resubmit,
	/// Refuse with an error and leave the decision to the workflow.
	Reject,
}

fn default_service_name() -> String {
	"write-target".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_http_port() -> u16 {
	8080
}

fn default_gas_limit() -> u64 {
	DEFAULT_GAS_LIMIT
}

/// Schema for the whole configuration file.
pub struct WriteTargetConfigSchema;

impl WriteTargetConfigSchema {
	fn service() -> Schema {
		Schema::new(
			vec![],
			vec![
				Field::new("name", FieldType::String),
				Field::new("log_level", FieldType::String).with_validator(|value| {
					match value.as_str().unwrap_or_default() {
						"trace" | "debug" | "info" | "warn" | "error" => Ok(()),
						other => Err(format!("Unknown log level '{}'", other)),
					}
				}),
				Field::new(
					"http_port",
					FieldType::Integer {
						min: Some(1),
						max: Some(u16::MAX as i64),
					},
				),
			],
		)
	}

	fn workflow() -> Schema {
		Schema::new(
			vec![],
			vec![
				Field::new("from_address", FieldType::Address),
				Field::new("forwarder_address", FieldType::Address),
				Field::new(
					"gas_limit_default",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new("failed_transmission_policy", FieldType::String).with_validator(
					|value| match value.as_str().unwrap_or_default() {
						"resubmit" | "reject" => Ok(()),
						other => Err(format!(
							"Unknown policy '{}', expected 'resubmit' or 'reject'",
							other
						)),
					},
				),
			],
		)
	}

	fn chain() -> Schema {
		Schema::new(
			vec![
				Field::new("name", FieldType::String).with_validator(|value| {
					if value.as_str().unwrap_or_default().is_empty() {
						Err("Chain name must not be empty".to_string())
					} else {
						Ok(())
					}
				}),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new("rpc_url", FieldType::String).with_validator(|value| {
					let url = value.as_str().unwrap_or_default();
					if url.starts_with("http://") || url.starts_with("https://") {
						Ok(())
					} else {
						Err("RPC URL must start with http:// or https://".to_string())
					}
				}),
			],
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let digits = key.strip_prefix("0x").unwrap_or(key);
					if digits.len() != 64 {
						return Err("Private key must be 64 hex characters (32 bytes)".to_string());
					}
					if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
						return Err("Private key must be valid hexadecimal".to_string());
					}
					Ok(())
				}),
				Field::new("workflow", FieldType::Table(Self::workflow())),
			],
		)
	}
}

impl ConfigSchema for WriteTargetConfigSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("service", FieldType::Table(Self::service())),
				Field::new("chains", FieldType::Array(Box::new(FieldType::Table(Self::chain())))),
			],
		);
		schema.validate(config)?;

		// Capability ids are derived from chain names, so names must be unique
		let mut seen = std::collections::HashSet::new();
		for chain in config
			.get("chains")
			.and_then(|c| c.as_array())
			.into_iter()
			.flatten()
		{
			if let Some(name) = chain.get("name").and_then(|n| n.as_str()) {
				if !seen.insert(name) {
					return Err(ValidationError::InvalidValue {
						field: "chains".to_string(),
						message: format!("Duplicate chain name '{}'", name),
					});
				}
			}
		}

		Ok(())
	}
}

impl Default for WorkflowConfig {
	fn default() -> Self {
		Self {
			from_address: None,
			forwarder_address: None,
			gas_limit_default: DEFAULT_GAS_LIMIT,
			failed_transmission_policy: FailedTransmissionPolicy::default(),
		}
	}
}

impl WorkflowConfig {
	/// Both addresses needed to register a write capability, if configured.
	pub fn addresses(&self) -> Option<(Address, Address)> {
		Some((self.from_address?, self.forwarder_address?))
	}
}
