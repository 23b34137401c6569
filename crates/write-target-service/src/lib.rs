//! Service entry point for the write target.
//!
//! - `api`: HTTP endpoints for listing and invoking capabilities
//! - `cli`: command-line interface
//! - `service`: builds relayers from configuration and runs registration

pub mod api;
pub mod cli;
pub mod service;
