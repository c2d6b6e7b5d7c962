//! Shared test utilities for the MCP gateway client.
//!
//! This crate provides:
//! - A wiremock-backed mock gateway with JSON-RPC echo support
//! - Proptest generators for capability names, identities and arguments
//! - Test fixtures with sample tool listings

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod generators;
pub mod mocks;
pub mod fixtures;

pub use generators::*;
pub use mocks::{EchoResponder, MockGateway};
