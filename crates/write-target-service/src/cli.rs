//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "write-target")]
#[command(about = "Writes signed workflow reports to chain", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", env = "CONFIG_FILE", default_value = "config/local.toml")]
	pub config: PathBuf,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(long, env = "LOG_LEVEL")]
	pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
	/// Start the write target service
	Start,
	/// Validate the configuration file
	Validate,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_to_start() {
		let cli = Cli::try_parse_from(["write-target"]).unwrap();
		assert_eq!(cli.command, None);
		assert_eq!(cli.config, PathBuf::from("config/local.toml"));
	}

	#[test]
	fn test_validate_with_config() {
		let cli = Cli::try_parse_from([
			"write-target",
			"--config",
			"sepolia.toml",
			"--log-level",
			"debug",
			"validate",
		])
		.unwrap();
		assert_eq!(cli.command, Some(Commands::Validate));
		assert_eq!(cli.config, PathBuf::from("sepolia.toml"));
		assert_eq!(cli.log_level.as_deref(), Some("debug"));
	}
}
