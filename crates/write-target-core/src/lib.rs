//! The chain write capability.
//!
//! A [`WriteTarget`] takes a signed report from a workflow and makes sure it
//! reaches its receiver contract through a forwarder at most once:
//! it validates the request, decodes the report envelope, asks the forwarder
//! whether the report was already delivered, and only then hands a single
//! transaction to the transaction manager.
//!
//! A [`Relayer`] owns the chain-scoped wiring and registers the capability
//! with a [`CapabilityRegistry`] at startup.

pub mod builder;
pub mod error;
pub mod reader;
pub mod registry;
pub mod relayer;
pub mod status;
pub mod submitter;
pub mod target;
pub mod validate;

pub use builder::TransactionBuilder;
pub use error::{CapabilityError, RegistrationSkipped, RegistryError};
pub use reader::ChainStateReader;
pub use registry::{CapabilityRegistry, InMemoryCapabilityRegistry};
pub use relayer::{Registration, Relayer};
pub use status::StatusTracker;
pub use submitter::TransactionSubmitter;
pub use target::{Capability, WriteTarget, WriteTargetSettings};
pub use validate::{gas_limit_override, receiver_override, validate_config};
