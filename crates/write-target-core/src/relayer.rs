//! Per-chain wiring of the write capability.

use crate::{
	Capability, CapabilityRegistry, RegistrationSkipped, RegistryError, WriteTarget,
	WriteTargetSettings,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use write_target_chain::{ChainClient, TransactionManager};
use write_target_config::ChainConfig;
use write_target_forwarder::{ForwarderBinding, KeystoneForwarderV1};

/// What [`Relayer::start`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
	/// The capability was added under this id.
	Registered(String),
	Skipped(RegistrationSkipped),
	/// An earlier call already ran registration.
	AlreadyStarted,
}

/// Owns the chain services of one configured chain.
pub struct Relayer {
	chain: ChainConfig,
	client: Arc<dyn ChainClient>,
	txm: Arc<dyn TransactionManager>,
	registry: Arc<dyn CapabilityRegistry>,
	started: AtomicBool,
}

impl Relayer {
	pub fn new(
		chain: ChainConfig,
		client: Arc<dyn ChainClient>,
		txm: Arc<dyn TransactionManager>,
		registry: Arc<dyn CapabilityRegistry>,
	) -> Self {
		Self {
			chain,
			client,
			txm,
			registry,
			started: AtomicBool::new(false),
		}
	}

	pub fn chain_name(&self) -> &str {
		&self.chain.name
	}

	/// Registers the write capability, at most once per relayer.
	///
	/// Missing workflow settings or an undeployed forwarder skip registration
	/// with a warning; only a registry conflict is an error.
	#[instrument(skip(self), fields(chain = %self.chain.name, chain_id = self.chain.chain_id))]
	pub async fn start(&self) -> Result<Registration, RegistryError> {
		if self.started.swap(true, Ordering::SeqCst) {
			return Ok(Registration::AlreadyStarted);
		}

		match self.build_target().await {
			Ok(target) => {
				let id = target.info().id;
				self.registry.add(Arc::new(target)).await?;
				info!(capability_id = %id, "Registered write capability");
				Ok(Registration::Registered(id))
			}
			Err(reason) => {
				warn!(%reason, "Write capability not registered");
				Ok(Registration::Skipped(reason))
			}
		}
	}

	async fn build_target(&self) -> Result<WriteTarget, RegistrationSkipped> {
		let workflow = &self.chain.workflow;
		let from_address = workflow
			.from_address
			.ok_or(RegistrationSkipped::MissingFromAddress)?;
		let forwarder_address = workflow
			.forwarder_address
			.ok_or(RegistrationSkipped::MissingForwarderAddress)?;

		let forwarder = Arc::new(KeystoneForwarderV1::new(
			forwarder_address,
			self.client.clone(),
		));
		match forwarder.is_deployed().await {
			Ok(true) => {}
			Ok(false) => {
				return Err(RegistrationSkipped::ForwarderNotDeployed(forwarder_address))
			}
			Err(e) => return Err(RegistrationSkipped::ForwarderLookupFailed(e.to_string())),
		}

		Ok(WriteTarget::new(
			WriteTargetSettings {
				chain_name: self.chain.name.clone(),
				from_address,
				gas_limit_default: workflow.gas_limit_default,
				failed_transmission_policy: workflow.failed_transmission_policy,
			},
			forwarder,
			self.txm.clone(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::InMemoryCapabilityRegistry;
	use write_target_chain::testing::{FakeChainClient, FakeTransactionManager};
	use write_target_config::WorkflowConfig;
	use write_target_types::Address;

	const FORWARDER: Address = Address::new([0xf0; 20]);

	fn chain(workflow: WorkflowConfig) -> ChainConfig {
		ChainConfig {
			name: "anvil".to_string(),
			chain_id: 31337,
			rpc_url: "http://localhost:8545".to_string(),
			private_key: None,
			workflow,
		}
	}

	fn configured() -> WorkflowConfig {
		WorkflowConfig {
			from_address: Some(Address::repeat_byte(0x01)),
			forwarder_address: Some(FORWARDER),
			..Default::default()
		}
	}

	async fn relayer(
		workflow: WorkflowConfig,
		deployed: bool,
	) -> (Relayer, Arc<InMemoryCapabilityRegistry>) {
		let client = Arc::new(FakeChainClient::new());
		if deployed {
			client.set_code(FORWARDER, vec![0x60, 0x80, 0x60, 0x40]).await;
		}
		let registry = Arc::new(InMemoryCapabilityRegistry::new());
		let relayer = Relayer::new(
			chain(workflow),
			client,
			Arc::new(FakeTransactionManager::new()),
			registry.clone(),
		);
		(relayer, registry)
	}

	#[tokio::test]
	async fn test_registers_once() {
		let (relayer, registry) = relayer(configured(), true).await;

		assert_eq!(
			relayer.start().await.unwrap(),
			Registration::Registered("write_anvil@1.0.0".to_string())
		);
		assert_eq!(relayer.start().await.unwrap(), Registration::AlreadyStarted);
		assert_eq!(registry.list().await.len(), 1);
	}

	#[tokio::test]
	async fn test_missing_from_address_skips_registration() {
		let workflow = WorkflowConfig {
			from_address: None,
			..configured()
		};
		let (relayer, registry) = relayer(workflow, true).await;

		assert_eq!(
			relayer.start().await.unwrap(),
			Registration::Skipped(RegistrationSkipped::MissingFromAddress)
		);
		assert!(registry.list().await.is_empty());
	}

	#[tokio::test]
	async fn test_missing_forwarder_skips_registration() {
		let workflow = WorkflowConfig {
			forwarder_address: None,
			..configured()
		};
		let (relayer, registry) = relayer(workflow, true).await;

		assert_eq!(
			relayer.start().await.unwrap(),
			Registration::Skipped(RegistrationSkipped::MissingForwarderAddress)
		);
		assert!(registry.list().await.is_empty());
	}

	#[tokio::test]
	async fn test_undeployed_forwarder_skips_registration() {
		let (relayer, registry) = relayer(configured(), false).await;

		assert_eq!(
			relayer.start().await.unwrap(),
			Registration::Skipped(RegistrationSkipped::ForwarderNotDeployed(FORWARDER))
		);
		assert!(registry.list().await.is_empty());
	}
}
