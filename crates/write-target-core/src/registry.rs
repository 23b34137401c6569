//! Capability registry.

use crate::{Capability, RegistryError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use write_target_types::CapabilityInfo;

/// Where capabilities are published for workflows to discover.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
	/// Adds a capability; its id must not be registered yet.
	async fn add(&self, capability: Arc<dyn Capability>) -> Result<(), RegistryError>;

	/// Infos of all registered capabilities, ordered by id.
	async fn list(&self) -> Vec<CapabilityInfo>;

	async fn get(&self, id: &str) -> Option<Arc<dyn Capability>>;
}

/// Process-local registry.
#[derive(Default)]
pub struct InMemoryCapabilityRegistry {
	capabilities: RwLock<HashMap<String, Arc<dyn Capability>>>,
}

impl InMemoryCapabilityRegistry {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl CapabilityRegistry for InMemoryCapabilityRegistry {
	async fn add(&self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
		let id = capability.info().id;
		let mut capabilities = self.capabilities.write().await;
		if capabilities.contains_key(&id) {
			return Err(RegistryError::DuplicateCapability(id));
		}
		capabilities.insert(id, capability);
		Ok(())
	}

	async fn list(&self) -> Vec<CapabilityInfo> {
		let mut infos: Vec<_> = self
			.capabilities
			.read()
			.await
			.values()
			.map(|c| c.info())
			.collect();
		infos.sort_by(|a, b| a.id.cmp(&b.id));
		infos
	}

	async fn get(&self, id: &str) -> Option<Arc<dyn Capability>> {
		self.capabilities.read().await.get(id).cloned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{WriteTarget, WriteTargetSettings};
	use write_target_chain::testing::{FakeChainClient, FakeTransactionManager};
	use write_target_config::FailedTransmissionPolicy;
	use write_target_forwarder::KeystoneForwarderV1;
	use write_target_types::Address;

	fn target(chain: &str) -> Arc<dyn Capability> {
		Arc::new(WriteTarget::new(
			WriteTargetSettings {
				chain_name: chain.to_string(),
				from_address: Address::repeat_byte(1),
				gas_limit_default: 400_000,
				failed_transmission_policy: FailedTransmissionPolicy::Resubmit,
			},
			Arc::new(KeystoneForwarderV1::new(
				Address::repeat_byte(0xf0),
				Arc::new(FakeChainClient::new()),
			)),
			Arc::new(FakeTransactionManager::new()),
		))
	}

	#[tokio::test]
	async fn test_add_get_list() {
		let registry = InMemoryCapabilityRegistry::new();
		registry.add(target("sepolia")).await.unwrap();
		registry.add(target("anvil")).await.unwrap();

		let ids: Vec<_> = registry.list().await.into_iter().map(|i| i.id).collect();
		assert_eq!(ids, vec!["write_anvil@1.0.0", "write_sepolia@1.0.0"]);
		assert!(registry.get("write_anvil@1.0.0").await.is_some());
		assert!(registry.get("write_mainnet@1.0.0").await.is_none());
	}

	#[tokio::test]
	async fn test_duplicate_is_rejected() {
		let registry = InMemoryCapabilityRegistry::new();
		registry.add(target("anvil")).await.unwrap();
		assert_eq!(
			registry.add(target("anvil")).await,
			Err(RegistryError::DuplicateCapability(
				"write_anvil@1.0.0".to_string()
			))
		);
	}
}
