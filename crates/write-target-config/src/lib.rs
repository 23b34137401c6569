//! Configuration loading for the write target service.
//!
//! A configuration file goes through four steps: `${VAR}` references are
//! replaced with environment values, the result is parsed as TOML and checked
//! against [`WriteTargetConfigSchema`], the checked value is deserialized into
//! [`WriteTargetConfig`], and finally `WRITE_TARGET_*` environment overrides
//! are applied.

use regex::Regex;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use write_target_types::ConfigSchema;

mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

impl From<write_target_types::ValidationError> for ConfigError {
	fn from(err: write_target_types::ValidationError) -> Self {
		ConfigError::ValidationError(err.to_string())
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "WRITE_TARGET_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<WriteTargetConfig, ConfigError> {
		let Some(file_path) = &self.file_path else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		info!(path = %file_path, "Loading configuration");
		let content = tokio::fs::read_to_string(file_path)
			.await
			.map_err(|e| match e.kind() {
				std::io::ErrorKind::NotFound => ConfigError::FileNotFound(file_path.clone()),
				_ => ConfigError::IoError(e),
			})?;

		let mut config = self.parse(&content)?;
		self.apply_env_overrides(&mut config)?;

		debug!(chains = config.chains.len(), "Configuration loaded");
		Ok(config)
	}

	/// Substitutes, validates and deserializes configuration text.
	pub fn parse(&self, content: &str) -> Result<WriteTargetConfig, ConfigError> {
		let substituted = self.substitute_env_vars(content)?;

		let value: toml::Value =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;

		WriteTargetConfigSchema.validate(&value)?;

		value
			.try_into()
			.map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		// Find and replace ${VAR_NAME} patterns
		let re = Regex::new(r"\$\{([^}]+)\}")
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut WriteTargetConfig) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.service.log_level = log_level;
		}

		if let Ok(http_port) = env::var(format!("{}HTTP_PORT", self.env_prefix)) {
			debug!("Overriding HTTP port from environment");
			config.service.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		Ok(())
	}
}
