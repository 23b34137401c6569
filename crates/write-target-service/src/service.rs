//! Service assembly: one relayer per configured chain.

use anyhow::{Context as _, Result};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info};
use write_target_chain::implementations::evm::alloy::{
	connect_http, AlloyChainClient, AlloyTransactionManager,
};
use write_target_config::WriteTargetConfig;
use write_target_core::{CapabilityRegistry, InMemoryCapabilityRegistry, Registration, Relayer};

/// Relayers of all configured chains and the registry they publish to.
pub struct WriteTargetService {
	registry: Arc<InMemoryCapabilityRegistry>,
	relayers: Vec<Relayer>,
}

impl WriteTargetService {
	pub fn new(registry: Arc<InMemoryCapabilityRegistry>, relayers: Vec<Relayer>) -> Self {
		Self { registry, relayers }
	}

	/// Connects to every configured chain over HTTP.
	pub fn from_config(config: &WriteTargetConfig) -> Result<Self> {
		let registry = Arc::new(InMemoryCapabilityRegistry::new());
		let mut relayers = Vec::with_capacity(config.chains.len());

		for chain in &config.chains {
			info!(chain = %chain.name, chain_id = chain.chain_id, "Configuring chain");
			let provider = connect_http(&chain.rpc_url, chain.private_key.as_deref())
				.with_context(|| format!("Failed to connect to chain {}", chain.name))?;

			relayers.push(Relayer::new(
				chain.clone(),
				Arc::new(AlloyChainClient::new(provider.clone())),
				Arc::new(AlloyTransactionManager::new(provider)),
				registry.clone(),
			));
		}

		Ok(Self::new(registry, relayers))
	}

	pub fn registry(&self) -> Arc<InMemoryCapabilityRegistry> {
		self.registry.clone()
	}

	/// Runs registration on every relayer. Returns the registered capability ids.
	///
	/// A chain that cannot be registered is logged and does not stop the others.
	pub async fn start(&self) -> Vec<String> {
		let results = join_all(self.relayers.iter().map(|relayer| relayer.start())).await;

		let mut registered = Vec::new();
		for (relayer, result) in self.relayers.iter().zip(results) {
			match result {
				Ok(Registration::Registered(id)) => registered.push(id),
				Ok(_) => {}
				Err(e) => error!(chain = %relayer.chain_name(), "Registration failed: {}", e),
			}
		}

		info!(
			registered = registered.len(),
			chains = self.relayers.len(),
			"Relayers started"
		);
		registered
	}

	pub async fn capability_count(&self) -> usize {
		self.registry.list().await.len()
	}
}
