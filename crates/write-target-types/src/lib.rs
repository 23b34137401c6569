//! Shared types for the write target.
//!
//! This crate holds the data model that every other crate in the workspace
//! speaks: the fixed-layout report envelope and its on-chain transmission
//! record (together with their byte codecs), the capability request and
//! response values, transaction manager requests and statuses, the
//! invocation context used for cancellation, and the schema primitives used
//! to validate configuration files.

pub mod capability;
pub mod context;
pub mod errors;
pub mod report;
pub mod transaction;
pub mod transmission;
pub mod validation;

pub use alloy::primitives::{Address, Bytes, FixedBytes, B256, U256};

pub use capability::*;
pub use context::*;
pub use errors::*;
pub use report::*;
pub use transaction::*;
pub use transmission::*;
pub use validation::*;
