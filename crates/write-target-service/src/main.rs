use anyhow::{Context as _, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{
	layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};
use write_target_config::{ConfigLoader, WriteTargetConfig};
use write_target_service::api::{self, AppState};
use write_target_service::cli::{Cli, Commands};
use write_target_service::service::WriteTargetService;
use write_target_types::Context;

const DEFAULT_LOG_LEVEL: &str = "info";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	// Initialize tracing
	let filter = setup_tracing(cli.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL))?;

	info!("Loading configuration from: {:?}", cli.config);
	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

	let rust_log_set = std::env::var_os("RUST_LOG").is_some();
	if let Some(level) =
		configured_log_level(cli.log_level.as_deref(), rust_log_set, &config.service.log_level)
	{
		filter
			.reload(EnvFilter::new(level))
			.context("Failed to apply configured log level")?;
	}

	match cli.command {
		Some(Commands::Start) | None => start_service(config).await,
		Some(Commands::Validate) => validate_config(&cli, &config),
	}
}

/// Level from the config file, applied only when neither `--log-level` nor
/// `RUST_LOG` chose one.
fn configured_log_level<'a>(
	cli_level: Option<&str>,
	rust_log_set: bool,
	config_level: &'a str,
) -> Option<&'a str> {
	if cli_level.is_some() || rust_log_set {
		None
	} else {
		Some(config_level)
	}
}

async fn start_service(config: WriteTargetConfig) -> Result<()> {
	info!(name = %config.service.name, "Starting write target service");

	let service = WriteTargetService::from_config(&config)
		.context("Failed to build relayers")?;
	let registered = service.start().await;
	info!(capabilities = ?registered, "Registration finished");

	let (ctx, cancel) = Context::with_cancel();
	let state = AppState {
		registry: service.registry(),
		ctx,
	};

	let shutdown = async move {
		setup_shutdown_signal().await;
		info!("Shutdown signal received, stopping service...");
		cancel.cancel();
	};

	api::serve(state, config.service.http_port, shutdown)
		.await
		.context("HTTP server failed")?;

	info!("Write target service stopped");
	Ok(())
}

fn validate_config(cli: &Cli, config: &WriteTargetConfig) -> Result<()> {
	info!("Configuration file {:?} is valid", cli.config);
	info!("Service name: {}", config.service.name);
	info!("HTTP port: {}", config.service.http_port);

	for chain in &config.chains {
		let workflow = &chain.workflow;
		match workflow.addresses() {
			Some((from, forwarder)) => info!(
				"  Chain {} ({}): from {} via forwarder {}, gas limit {}, {:?} on failed transmission",
				chain.name,
				chain.chain_id,
				from,
				forwarder,
				workflow.gas_limit_default,
				workflow.failed_transmission_policy
			),
			None => info!(
				"  Chain {} ({}): no workflow sender/forwarder, write capability disabled",
				chain.name, chain.chain_id
			),
		}
	}

	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<FilterHandle> {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
	let (filter, handle) = reload::Layer::new(env_filter);

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(handle)
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
